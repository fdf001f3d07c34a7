//! `site-settings`: inspect and edit a site's settings from the command line.

mod cli;

use clap::Parser;
use cli::Cli;

fn main() -> anyhow::Result<()> {
    Cli::parse().run()
}
