use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
};

use houston_settings::{SettingKey, SiteSettings};
use serde_json::Value;
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The settings key to write
    key: SettingKey,

    /// A file containing the JSON value (defaults to stdin)
    file: Option<PathBuf>,

    /// Validate the value without storing it
    #[arg(long)]
    dry_run: bool,
}

impl Command {
    fn read_value(&self) -> anyhow::Result<Value> {
        let content = match &self.file {
            Some(path) => fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?,
            None => {
                let mut content = String::new();
                io::stdin().read_to_string(&mut content)?;
                content
            }
        };
        serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Invalid JSON: {e}"))
    }

    #[instrument(skip(settings))]
    pub fn run(self, settings: &SiteSettings) -> anyhow::Result<()> {
        let value = self.read_value()?;

        if self.dry_run {
            settings.validate(self.key, &value)?;
            println!("{}", format!("✅ {} is valid", self.key).success());
        } else {
            settings.set(self.key, value)?;
            println!("{}", format!("✅ Updated {}", self.key).success());
        }
        Ok(())
    }
}
