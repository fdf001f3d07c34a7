use houston_settings::SiteSettings;
use tracing::instrument;

use crate::cli::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The definition to remove, e.g. `site.custom.customFields.Encounter/<id>`
    path: String,

    /// Skip confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl Command {
    #[instrument(skip(settings))]
    pub fn run(self, settings: &SiteSettings) -> anyhow::Result<()> {
        if !self.yes {
            println!(
                "{}",
                format!("⚠️  About to remove custom field {}", self.path).warning()
            );
            println!(
                "{}",
                "The removal is refused if any object still holds a value for it.".dim()
            );

            let confirmed = dialoguer::Confirm::new()
                .with_prompt("Proceed?")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Cancelled");
                std::process::exit(130);
            }
        }

        settings.patch_remove(&self.path)?;
        println!("{}", format!("✅ Removed {}", self.path).success());
        Ok(())
    }
}
