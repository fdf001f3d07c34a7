//! Site settings for a wildlife-data platform
//!
//! Administrators define typed custom fields per domain class (Encounter,
//! Sighting, Individual). Definitions are validated, stored as settings
//! documents, and protected against edits that would orphan or invalidate
//! data already recorded against them.

pub mod audit;
pub use audit::{AuditLog, RecordingAudit, TracingAudit};

pub mod domain;
pub use domain::{ClassName, Config, ConfigurationError, CustomFieldDefinition, Module};

pub mod settings;
pub use settings::{CustomFieldRegistry, Error, SettingKey, SiteSettings, UsageGuard};

pub mod storage;
pub use storage::{JsonFileStore, JsonObjectStore, MemoryObjects, MemoryStore, SettingsStore};
