//! Checks live domain objects before a field is changed or dropped.

use tracing::instrument;
use uuid::Uuid;

use crate::{
    domain::{ClassName, ConfigurationError, UsageAction, reject},
    settings::Error,
    storage::{DomainObjectStore, StoreError},
};

/// Refuses destructive schema edits while live objects still hold values for
/// the field.
///
/// There is no migration path: a change that could invalidate existing data
/// is rejected outright.
#[derive(Clone, Copy)]
pub struct UsageGuard<'a> {
    objects: &'a dyn DomainObjectStore,
}

impl<'a> UsageGuard<'a> {
    /// Creates a guard backed by `objects`.
    #[must_use]
    pub const fn new(objects: &'a dyn DomainObjectStore) -> Self {
        Self { objects }
    }

    /// Returns the ids of `class` objects holding a non-null value for
    /// `field_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the object store cannot be queried.
    pub fn find_data(&self, field_id: &str, class: ClassName) -> Result<Vec<Uuid>, StoreError> {
        self.objects.objects_with_custom_field(class, field_id)
    }

    /// Fails if any object uses `field_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::FieldInUse`] naming the number of
    /// objects, or a store error if they cannot be counted.
    #[instrument(skip(self))]
    pub fn ensure_unused(
        &self,
        class: ClassName,
        field_id: &str,
        action: UsageAction,
    ) -> Result<(), Error> {
        let using = self.find_data(field_id, class)?;
        if using.is_empty() {
            return Ok(());
        }
        reject(ConfigurationError::FieldInUse {
            class,
            id: field_id.to_string(),
            count: using.len(),
            action,
        })
    }

    /// Fails if the definition `field_id` cannot have its content changed.
    ///
    /// # Errors
    ///
    /// See [`UsageGuard::ensure_unused`].
    pub fn ensure_unused_for_change(&self, class: ClassName, field_id: &str) -> Result<(), Error> {
        self.ensure_unused(class, field_id, UsageAction::Change)
    }

    /// Fails if the definition `field_id` cannot be dropped.
    ///
    /// # Errors
    ///
    /// See [`UsageGuard::ensure_unused`].
    pub fn ensure_unused_for_drop(&self, class: ClassName, field_id: &str) -> Result<(), Error> {
        self.ensure_unused(class, field_id, UsageAction::Drop)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryObjects;

    #[test]
    fn unused_field_passes() {
        let objects = MemoryObjects::new();
        let guard = UsageGuard::new(&objects);
        guard.ensure_unused_for_drop(ClassName::Encounter, "f1").unwrap();
        guard.ensure_unused_for_change(ClassName::Encounter, "f1").unwrap();
    }

    #[test]
    fn used_field_reports_count() {
        let objects = MemoryObjects::new();
        for _ in 0..2 {
            objects.insert(
                ClassName::Sighting,
                Uuid::new_v4(),
                json!({"f1": 12}).as_object().unwrap().clone(),
            );
        }
        let guard = UsageGuard::new(&objects);

        assert_eq!(guard.find_data("f1", ClassName::Sighting).unwrap().len(), 2);
        let err = guard.ensure_unused_for_change(ClassName::Sighting, "f1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "customFields.Sighting id f1 in use by 2 objects; cannot be changed"
        );
    }
}
