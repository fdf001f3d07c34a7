use houston_settings::{SettingKey, SiteSettings};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The settings key, e.g. `site.custom.customFields.Encounter`
    key: SettingKey,
}

impl Command {
    #[instrument(skip(settings))]
    pub fn run(self, settings: &SiteSettings) -> anyhow::Result<()> {
        match settings.get(self.key)? {
            Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
            None => println!("{}", format!("ℹ️  {} is not set", self.key).info()),
        }
        Ok(())
    }
}
