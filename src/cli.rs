use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

mod check;
mod get;
mod init;
mod next_name;
mod remove;
mod set;
mod terminal;

use clap::ArgAction;
use houston_settings::{Config, JsonFileStore, JsonObjectStore, SiteSettings, TracingAudit};

/// Directory under the root holding the config and the stores.
const SETTINGS_DIR: &str = ".settings";

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the site root (the directory containing `.settings`)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Who to attribute audited changes to
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let workspace = Workspace {
            dir: self.root.join(SETTINGS_DIR),
            actor: self.actor,
        };
        self.command.run(&workspace)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Initialize an empty settings directory
    Init,

    /// Print the stored value of a settings key
    Get(get::Command),

    /// Validate and store a JSON value for a settings key
    ///
    /// The value is read from FILE, or from stdin if no file is given.
    Set(set::Command),

    /// Remove a custom field definition
    ///
    /// Fails if any object still holds a value for the field.
    Remove(remove::Command),

    /// Check a value against a custom field definition
    Check(check::Command),

    /// Hand out the next value of an autogenerated name
    NextName(next_name::Command),
}

impl Command {
    fn run(self, workspace: &Workspace) -> anyhow::Result<()> {
        match self {
            Self::Init => init::run(&workspace.dir)?,
            Self::Get(command) => command.run(&workspace.open()?)?,
            Self::Set(command) => command.run(&workspace.open()?)?,
            Self::Remove(command) => command.run(&workspace.open()?)?,
            Self::Check(command) => command.run(&workspace.open()?)?,
            Self::NextName(command) => command.run(&workspace.open()?)?,
        }
        Ok(())
    }
}

/// Where the settings live, and who is acting on them.
#[derive(Debug)]
struct Workspace {
    dir: PathBuf,
    actor: Option<String>,
}

impl Workspace {
    fn config_path(dir: &Path) -> PathBuf {
        dir.join("config.toml")
    }

    fn open(&self) -> anyhow::Result<SiteSettings> {
        if !self.dir.is_dir() {
            anyhow::bail!(
                "Settings not initialized. Run 'site-settings init' first or pass --root"
            );
        }
        let config =
            Config::load(&Self::config_path(&self.dir)).map_err(|e| anyhow::anyhow!("{e}"))?;

        let store = JsonFileStore::new(self.dir.join(&config.store_file));
        let objects = JsonObjectStore::new(self.dir.join(&config.objects_file));
        let settings = SiteSettings::new(
            Arc::new(store),
            Arc::new(objects),
            Arc::new(TracingAudit),
            config,
        );
        Ok(match &self.actor {
            Some(actor) => settings.with_actor(actor),
            None => settings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace {
            dir: tmp.path().to_path_buf(),
            actor: None,
        };

        let settings = workspace.open().unwrap();
        assert_eq!(settings.config(), &Config::default());
    }

    #[test]
    fn missing_directory_is_not_initialized() {
        let tmp = tempfile::tempdir().unwrap();
        let workspace = Workspace {
            dir: tmp.path().join(SETTINGS_DIR),
            actor: None,
        };

        let Err(err) = workspace.open() else {
            panic!("opened a workspace that was never initialized");
        };
        assert!(err.to_string().starts_with("Settings not initialized"));
    }
}
