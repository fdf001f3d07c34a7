//! A settings store persisted as a single JSON file.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use fs2::FileExt;
use serde_json::Value;

use crate::storage::settings::{
    Entries, Precondition, SettingsStore, StoreError, Versioned, write_entry,
};

/// A file-backed [`SettingsStore`].
///
/// The file is re-read on every call, so several handles (or processes) see
/// each other's writes. Writes go to a sibling temporary file which is then
/// renamed over the original.
///
/// Each write holds an exclusive advisory lock on a sibling `.lock` file for
/// the whole read, version check and write, so conditional writes from
/// separate processes are serialised too. Processes that write the file
/// without taking the lock are not.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens a store at `path`. The file need not exist yet.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {}, starting empty", self.path.display());
                Ok(Entries::new())
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Blocks until no other process is writing. Released when the file is
    /// closed.
    fn lock_file(&self) -> Result<File, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.path.with_extension("json.lock"))
            .map_err(|e| self.io_error(e))?;
        file.lock_exclusive().map_err(|e| self.io_error(e))?;
        Ok(file)
    }

    fn write(
        &self,
        key: &str,
        data: Value,
        public: bool,
        expected: Precondition,
    ) -> Result<u64, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = self.lock_file()?;
        let mut entries = self.read_entries()?;
        let version = write_entry(&mut entries, key, data, public, expected)?;
        self.write_entries(&entries)?;
        Ok(version)
    }
}

impl SettingsStore for JsonFileStore {
    fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set_if_version(
        &self,
        key: &str,
        data: Value,
        public: bool,
        expected: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.write(key, data, public, Precondition::Version(expected))
    }

    fn set(&self, key: &str, data: Value, public: bool) -> Result<(), StoreError> {
        self.write(key, data, public, Precondition::Unconditional).map(|_| ())
    }
}
