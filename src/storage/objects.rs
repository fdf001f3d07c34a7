//! Read access to the custom-field values of live domain objects.
//!
//! The usage guard needs exactly one query: which objects of a class hold a
//! non-null value for a given field id.

use std::{
    collections::BTreeMap,
    fs, io,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{domain::ClassName, storage::settings::StoreError};

/// Custom-field maps of one class, keyed by object id.
pub type ClassObjects = BTreeMap<Uuid, Map<String, Value>>;

/// Custom-field maps of every class.
pub type ObjectSnapshot = BTreeMap<ClassName, ClassObjects>;

/// The domain-object storage consulted by the usage guard.
pub trait DomainObjectStore: Send + Sync {
    /// Returns the ids of `class` objects whose custom fields hold a non-null
    /// value at `field_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be queried.
    fn objects_with_custom_field(
        &self,
        class: ClassName,
        field_id: &str,
    ) -> Result<Vec<Uuid>, StoreError>;
}

fn matching(objects: Option<&ClassObjects>, field_id: &str) -> Vec<Uuid> {
    objects
        .into_iter()
        .flatten()
        .filter(|(_, fields)| fields.get(field_id).is_some_and(|v| !v.is_null()))
        .map(|(guid, _)| *guid)
        .collect()
}

/// An in-memory object store.
#[derive(Debug, Default)]
pub struct MemoryObjects {
    objects: RwLock<ObjectSnapshot>,
}

impl MemoryObjects {
    /// Creates an empty object store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an object's custom-fields map.
    pub fn insert(&self, class: ClassName, guid: Uuid, custom_fields: Map<String, Value>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(class)
            .or_default()
            .insert(guid, custom_fields);
    }

    /// Removes an object. Returns `true` if it existed.
    pub fn remove(&self, class: ClassName, guid: Uuid) -> bool {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&class)
            .is_some_and(|objects| objects.remove(&guid).is_some())
    }
}

impl DomainObjectStore for MemoryObjects {
    fn objects_with_custom_field(
        &self,
        class: ClassName,
        field_id: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(matching(objects.get(&class), field_id))
    }
}

/// An object store read from a JSON snapshot file.
///
/// The file is shaped `{"Encounter": {"<uuid>": {"<field id>": <value>}}}`
/// and is re-read on every query. A missing file means no objects.
#[derive(Debug)]
pub struct JsonObjectStore {
    path: PathBuf,
}

impl JsonObjectStore {
    /// Opens a snapshot at `path`.
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<ObjectSnapshot, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(ObjectSnapshot::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ObjectSnapshot::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl DomainObjectStore for JsonObjectStore {
    fn objects_with_custom_field(
        &self,
        class: ClassName,
        field_id: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        Ok(matching(self.load()?.get(&class), field_id))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn null_values_do_not_count_as_usage() {
        let store = MemoryObjects::new();
        let used = Uuid::new_v4();
        store.insert(ClassName::Encounter, used, fields(json!({"f1": "red"})));
        store.insert(ClassName::Encounter, Uuid::new_v4(), fields(json!({"f1": null})));
        store.insert(ClassName::Encounter, Uuid::new_v4(), fields(json!({})));

        let found = store
            .objects_with_custom_field(ClassName::Encounter, "f1")
            .unwrap();
        assert_eq!(found, vec![used]);
    }

    #[test]
    fn classes_are_queried_separately() {
        let store = MemoryObjects::new();
        store.insert(ClassName::Sighting, Uuid::new_v4(), fields(json!({"f1": 1})));

        assert!(store
            .objects_with_custom_field(ClassName::Encounter, "f1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn removed_objects_stop_counting() {
        let store = MemoryObjects::new();
        let guid = Uuid::new_v4();
        store.insert(ClassName::Individual, guid, fields(json!({"f1": true})));
        assert!(store.remove(ClassName::Individual, guid));
        assert!(!store.remove(ClassName::Individual, guid));
        assert!(store
            .objects_with_custom_field(ClassName::Individual, "f1")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn snapshot_file_is_queried() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("objects.json");
        let guid = Uuid::new_v4();
        std::fs::write(
            &path,
            json!({"Encounter": {guid.to_string(): {"f1": "red"}}}).to_string(),
        )
        .unwrap();

        let store = JsonObjectStore::new(path);
        assert_eq!(
            store
                .objects_with_custom_field(ClassName::Encounter, "f1")
                .unwrap(),
            vec![guid]
        );
        assert!(store
            .objects_with_custom_field(ClassName::Sighting, "f1")
            .unwrap()
            .is_empty());
    }
}
