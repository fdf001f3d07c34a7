use houston_settings::SiteSettings;
use tracing::instrument;
use uuid::Uuid;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Command {
    /// The guid of the autogenerated name
    guid: Uuid,
}

impl Command {
    #[instrument(skip(settings))]
    pub fn run(self, settings: &SiteSettings) -> anyhow::Result<()> {
        let names = settings.autogenerated_names();
        let value = names.get_next(self.guid)?;
        let context = format!("{}{}", houston_settings::domain::autogen::CONTEXT_PREFIX, self.guid);

        match names.resolve_value(&context, &value)? {
            Some(display) => println!("{display}"),
            None => println!("{}", value.dim()),
        }
        Ok(())
    }
}
