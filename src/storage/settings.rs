//! The key → JSON settings store.
//!
//! Every key carries a version that increases by one on each write. Callers
//! that read, validate and then write (schema edits, counter increments)
//! pass the version they read to [`SettingsStore::set_if_version`], so a
//! concurrent writer makes the later commit fail instead of silently
//! overwriting it.

use std::{
    collections::BTreeMap,
    io,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored value with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    /// The stored document.
    pub value: Value,
    /// Whether non-admin readers may see the value.
    pub public: bool,
    /// Write counter, starting at 1.
    pub version: u64,
}

/// Errors raised by a store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("failed to access settings store at {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The backing document is not valid JSON, or a value could not be
    /// (de)serialized.
    #[error("settings store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another writer changed the key after it was read.
    #[error(
        "settings key '{key}' was modified concurrently (expected version {expected:?}, found {actual:?})"
    )]
    VersionConflict {
        /// The contested key.
        key: String,
        /// The version the caller read (`None`: the key did not exist).
        expected: Option<u64>,
        /// The version currently stored.
        actual: Option<u64>,
    },
}

/// A generic persistent key → JSON document store.
pub trait SettingsStore: Send + Sync {
    /// Reads a key together with its version.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, StoreError>;

    /// Writes a key if its version is still `expected`.
    ///
    /// `expected = None` requires the key to be absent. Returns the new
    /// version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] if the key was written since it
    /// was read, or an error if the backing storage cannot be written.
    fn set_if_version(
        &self,
        key: &str,
        data: Value,
        public: bool,
        expected: Option<u64>,
    ) -> Result<u64, StoreError>;

    /// Writes a key unconditionally.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, data: Value, public: bool) -> Result<(), StoreError>;

    /// Reads the value stored at a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get_value(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.get_versioned(key)?.map(|entry| entry.value))
    }

    /// Reads whether a key is public.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn is_public(&self, key: &str) -> Result<Option<bool>, StoreError> {
        Ok(self.get_versioned(key)?.map(|entry| entry.public))
    }
}

/// All entries of a store, keyed by settings key.
pub(crate) type Entries = BTreeMap<String, Versioned>;

/// The version precondition of a write.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Precondition {
    /// Write whatever the current version is.
    Unconditional,
    /// Write only if the current version is this one (`None`: key absent).
    Version(Option<u64>),
}

/// Applies a write to `entries` if `expected` holds.
pub(crate) fn write_entry(
    entries: &mut Entries,
    key: &str,
    data: Value,
    public: bool,
    expected: Precondition,
) -> Result<u64, StoreError> {
    let actual = entries.get(key).map(|entry| entry.version);
    if let Precondition::Version(expected) = expected {
        if expected != actual {
            return Err(StoreError::VersionConflict {
                key: key.to_string(),
                expected,
                actual,
            });
        }
    }
    let version = actual.map_or(1, |v| v + 1);
    tracing::debug!(key, version, "writing settings key");
    entries.insert(
        key.to_string(),
        Versioned {
            value: data,
            public,
            version,
        },
    );
    Ok(version)
}

/// An in-memory store.
///
/// Useful for tests and for embedding the engine behind another persistence
/// layer.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_if_version(
        &self,
        key: &str,
        data: Value,
        public: bool,
        expected: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        write_entry(&mut entries, key, data, public, Precondition::Version(expected))
    }

    fn set(&self, key: &str, data: Value, public: bool) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        write_entry(&mut entries, key, data, public, Precondition::Unconditional).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn versions_start_at_one_and_increase() {
        let store = MemoryStore::new();
        store.set("site.name", json!("Codex"), true).unwrap();
        store.set("site.name", json!("Flukebook"), true).unwrap();

        let entry = store.get_versioned("site.name").unwrap().unwrap();
        assert_eq!(entry.version, 2);
        assert_eq!(entry.value, json!("Flukebook"));
    }

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get_value("site.species").unwrap(), None);
        assert_eq!(store.is_public("site.species").unwrap(), None);
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let v1 = store.set_if_version("k", json!(1), false, None).unwrap();
        store.set_if_version("k", json!(2), false, Some(v1)).unwrap();

        let err = store.set_if_version("k", json!(3), false, Some(v1)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: Some(1),
                actual: Some(2),
                ..
            }
        ));
        assert_eq!(store.get_value("k").unwrap(), Some(json!(2)));
    }

    #[test]
    fn create_only_write_fails_when_key_exists() {
        let store = MemoryStore::new();
        store.set("k", json!(1), true).unwrap();
        assert!(store.set_if_version("k", json!(2), true, None).is_err());
    }
}
