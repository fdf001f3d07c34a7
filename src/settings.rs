//! Settings services: the custom-field registry, the usage guard, the
//! autogenerated-name counters and the per-key façade tying them together.

mod autogen_names;
mod custom_fields;
mod facade;
mod modules;
mod usage;

pub use autogen_names::AutogeneratedNames;
pub use custom_fields::{CustomFieldRegistry, ValidatedDefinitions};
pub use facade::{SettingKey, SiteSettings};
pub use modules::{
    assign_species_ids, validate_relationship_type_roles, validate_social_group_roles,
    validate_species,
};
pub use usage::UsageGuard;

use crate::{
    audit::AuditLog,
    domain::ConfigurationError,
    storage::{DomainObjectStore, SettingsStore, StoreError},
};

/// Errors returned by the settings services.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested change was rejected.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A collaborator failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Store(StoreError::Json(error))
    }
}

/// The collaborators a service call runs against.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// Holds every settings document.
    pub store: &'a dyn SettingsStore,
    /// Answers usage queries for the usage guard.
    pub objects: &'a dyn DomainObjectStore,
    /// Receives audit records.
    pub audit: &'a dyn AuditLog,
    /// Who is making the change, if known.
    pub actor: Option<&'a str>,
}

impl Context<'_> {
    fn audit(&self, message: &str) {
        self.audit.record(self.actor, message);
    }
}
