use houston_settings::{ClassName, SiteSettings};
use serde_json::Value;
use tracing::instrument;

use super::terminal::Colorize;

fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The class the field belongs to (Encounter, Sighting or Individual)
    class: ClassName,

    /// The custom field id
    field_id: String,

    /// The value to check, as JSON
    #[clap(value_parser = parse_json)]
    value: Value,
}

impl Command {
    #[instrument(skip(settings))]
    pub fn run(self, settings: &SiteSettings) -> anyhow::Result<()> {
        if settings.is_valid_value_for_class(self.class, &self.field_id, &self.value)? {
            println!("{}", "✅ valid".success());
        } else {
            println!(
                "{}",
                format!(
                    "⚠️  {} is not a valid value for {}.{}",
                    self.value, self.class, self.field_id
                )
                .warning()
            );
            std::process::exit(1);
        }
        Ok(())
    }
}
