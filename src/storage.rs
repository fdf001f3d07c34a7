//! Collaborator interfaces and their implementations.
//!
//! The engine depends on two stores: a key → JSON [`SettingsStore`] holding
//! every settings document, and a [`DomainObjectStore`] answering which live
//! objects use a custom field.

mod json_file;
pub mod keys;
mod objects;
mod settings;

pub use json_file::JsonFileStore;
pub use objects::{ClassObjects, DomainObjectStore, JsonObjectStore, MemoryObjects, ObjectSnapshot};
pub use settings::{MemoryStore, SettingsStore, StoreError, Versioned};
