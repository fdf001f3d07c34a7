//! Per-key routing of settings writes.
//!
//! Every write is validated in full before anything is stored. Keys owned by
//! a disabled module accept any value and store nothing.

use std::{fmt, str::FromStr, sync::Arc};

use serde_json::Value;
use tracing::instrument;

use crate::{
    audit::AuditLog,
    domain::{ClassName, Config, ConfigurationError, Module},
    settings::{
        AutogeneratedNames, Context, CustomFieldRegistry, Error, ValidatedDefinitions,
        assign_species_ids, validate_relationship_type_roles, validate_social_group_roles,
        validate_species,
    },
    storage::{DomainObjectStore, SettingsStore, StoreError, keys},
};

/// A settings key with module-specific handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// `site.species`
    Species,
    /// `site.custom.customFieldCategories`
    CustomFieldCategories,
    /// `site.custom.customFields.<Class>`
    CustomFields(ClassName),
    /// `site.custom.relationshipTypeRoles`
    RelationshipTypeRoles,
    /// `social_group_roles`
    SocialGroupRoles,
    /// `autogenerated_names`
    AutogeneratedNames,
}

impl SettingKey {
    /// The key under which the setting is stored.
    #[must_use]
    pub fn key(self) -> String {
        match self {
            Self::Species => keys::SPECIES.to_string(),
            Self::CustomFieldCategories => keys::CUSTOM_FIELD_CATEGORIES.to_string(),
            Self::CustomFields(class) => class.settings_key(),
            Self::RelationshipTypeRoles => keys::RELATIONSHIP_TYPE_ROLES.to_string(),
            Self::SocialGroupRoles => keys::SOCIAL_GROUP_ROLES.to_string(),
            Self::AutogeneratedNames => keys::AUTOGENERATED_NAMES.to_string(),
        }
    }

    /// The module that owns this key, if it is optional.
    const fn module(self) -> Option<Module> {
        match self {
            Self::SocialGroupRoles => Some(Module::SocialGroups),
            Self::AutogeneratedNames => Some(Module::AutogeneratedNames),
            _ => None,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for SettingKey {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            keys::SPECIES => Self::Species,
            keys::CUSTOM_FIELD_CATEGORIES => Self::CustomFieldCategories,
            keys::RELATIONSHIP_TYPE_ROLES => Self::RelationshipTypeRoles,
            keys::SOCIAL_GROUP_ROLES => Self::SocialGroupRoles,
            keys::AUTOGENERATED_NAMES => Self::AutogeneratedNames,
            other => other
                .strip_prefix(keys::CUSTOM_FIELDS_PREFIX)
                .and_then(|class| class.parse().ok())
                .map(Self::CustomFields)
                .ok_or_else(|| ConfigurationError::UnknownKey(s.to_string()))?,
        };
        Ok(key)
    }
}

/// A write that passed validation.
enum Pending {
    Store { key: SettingKey, value: Value },
    Definitions(ValidatedDefinitions),
    Names(Value),
    Disabled { key: SettingKey, module: Module },
}

/// The settings of one site.
pub struct SiteSettings {
    store: Arc<dyn SettingsStore>,
    objects: Arc<dyn DomainObjectStore>,
    audit: Arc<dyn AuditLog>,
    config: Config,
    actor: Option<String>,
}

impl SiteSettings {
    /// Creates the façade over the given collaborators.
    #[must_use]
    pub const fn new(
        store: Arc<dyn SettingsStore>,
        objects: Arc<dyn DomainObjectStore>,
        audit: Arc<dyn AuditLog>,
        config: Config,
    ) -> Self {
        Self {
            store,
            objects,
            audit,
            config,
            actor: None,
        }
    }

    /// Attributes subsequent audited changes to `actor`.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// The module configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Borrows the collaborators for a service call.
    #[must_use]
    pub fn context(&self) -> Context<'_> {
        Context {
            store: self.store.as_ref(),
            objects: self.objects.as_ref(),
            audit: self.audit.as_ref(),
            actor: self.actor.as_deref(),
        }
    }

    /// The custom field registry.
    #[must_use]
    pub fn custom_fields(&self) -> CustomFieldRegistry<'_> {
        CustomFieldRegistry::new(self.context())
    }

    /// The autogenerated-name counters.
    #[must_use]
    pub fn autogenerated_names(&self) -> AutogeneratedNames<'_> {
        AutogeneratedNames::new(self.context())
    }

    fn prepare(&self, key: SettingKey, value: Value) -> Result<Pending, Error> {
        if let Some(module) = key.module().filter(|m| !self.config.is_module_enabled(*m)) {
            return Ok(Pending::Disabled { key, module });
        }
        let pending = match key {
            SettingKey::Species => {
                validate_species(&value)?;
                Pending::Store {
                    key,
                    value: assign_species_ids(value),
                }
            }
            SettingKey::CustomFieldCategories => {
                self.custom_fields().validate_category_set(&value)?;
                Pending::Store { key, value }
            }
            SettingKey::CustomFields(class) => {
                Pending::Definitions(self.custom_fields().validate_definition_set(class, &value)?)
            }
            SettingKey::RelationshipTypeRoles => {
                validate_relationship_type_roles(&value)?;
                Pending::Store { key, value }
            }
            SettingKey::SocialGroupRoles => {
                validate_social_group_roles(&value)?;
                Pending::Store { key, value }
            }
            SettingKey::AutogeneratedNames => {
                self.autogenerated_names().validate_names(&value)?;
                Pending::Names(value)
            }
        };
        Ok(pending)
    }

    fn apply(&self, pending: Pending) -> Result<(), Error> {
        match pending {
            Pending::Store { key, value } => {
                tracing::debug!("Updating setting {key}");
                self.store.set(&key.key(), value, true)?;
                if key == SettingKey::SocialGroupRoles {
                    tracing::info!("Social group roles updated");
                }
            }
            Pending::Definitions(validated) => {
                self.custom_fields().commit_definition_set(validated)?;
            }
            Pending::Names(value) => self.autogenerated_names().set_names_as_rest(&value)?,
            Pending::Disabled { key, module } => {
                tracing::debug!("Ignoring {key}: module {module:?} is disabled");
            }
        }
        Ok(())
    }

    /// Checks `value` for `key` without storing it.
    ///
    /// # Errors
    ///
    /// Returns the error [`SiteSettings::set`] would fail with.
    #[instrument(skip(self, value))]
    pub fn validate(&self, key: SettingKey, value: &Value) -> Result<(), Error> {
        self.prepare(key, value.clone()).map(|_| ())
    }

    /// Validates and stores `value` for `key`.
    ///
    /// # Errors
    ///
    /// Fails without storing anything if `value` is rejected, or with a store
    /// error if persisting fails.
    #[instrument(skip(self, value))]
    pub fn set(&self, key: SettingKey, value: Value) -> Result<(), Error> {
        let pending = self.prepare(key, value)?;
        self.apply(pending)
    }

    /// Parses `key` and stores `value` for it.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::UnknownKey`] for keys without
    /// module-specific handling, otherwise as [`SiteSettings::set`].
    pub fn set_key(&self, key: &str, value: Value) -> Result<(), Error> {
        self.set(key.parse()?, value)
    }

    /// Returns the current value of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn get(&self, key: SettingKey) -> Result<Option<Value>, StoreError> {
        match key {
            SettingKey::AutogeneratedNames => self.autogenerated_names().names_as_rest().map(Some),
            other => self.store.get_value(&other.key()),
        }
    }

    /// Removes one custom field definition by patch path.
    ///
    /// # Errors
    ///
    /// See [`CustomFieldRegistry::patch_remove`].
    pub fn patch_remove(&self, path: &str) -> Result<(), Error> {
        self.custom_fields().patch_remove(path)
    }

    /// Checks `value` against a stored custom field definition.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn is_valid_value_for_class(
        &self,
        class: ClassName,
        field_id: &str,
        value: &Value,
    ) -> Result<bool, StoreError> {
        self.custom_fields()
            .is_valid_value_for_class(class, field_id, value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::{
        audit::RecordingAudit,
        storage::{MemoryObjects, MemoryStore},
    };

    fn settings(config: Config) -> (SiteSettings, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let settings = SiteSettings::new(
            store.clone(),
            Arc::new(MemoryObjects::new()),
            Arc::new(RecordingAudit::new()),
            config,
        )
        .with_actor("admin@example.org");
        (settings, store)
    }

    #[test_case("site.species", SettingKey::Species)]
    #[test_case("site.custom.customFieldCategories", SettingKey::CustomFieldCategories)]
    #[test_case("site.custom.customFields.Individual", SettingKey::CustomFields(ClassName::Individual))]
    #[test_case("site.custom.relationshipTypeRoles", SettingKey::RelationshipTypeRoles)]
    #[test_case("social_group_roles", SettingKey::SocialGroupRoles)]
    #[test_case("autogenerated_names", SettingKey::AutogeneratedNames)]
    fn keys_round_trip(raw: &str, key: SettingKey) {
        assert_eq!(raw.parse::<SettingKey>().unwrap(), key);
        assert_eq!(key.key(), raw);
    }

    #[test_case("site.name"; "unhandled key")]
    #[test_case("site.custom.customFields.Annotation"; "unknown class")]
    fn unknown_keys_are_rejected(raw: &str) {
        assert_eq!(
            raw.parse::<SettingKey>().unwrap_err(),
            ConfigurationError::UnknownKey(raw.to_string())
        );
    }

    #[test]
    fn species_get_ids_on_write() {
        let (settings, _) = settings(Config::default());
        settings
            .set(
                SettingKey::Species,
                json!([{"commonNames": ["Zebra"], "scientificName": "Equus quagga"}]),
            )
            .unwrap();

        let stored = settings.get(SettingKey::Species).unwrap().unwrap();
        assert!(stored[0]["id"].is_string());
    }

    #[test]
    fn rejected_write_stores_nothing() {
        let (settings, store) = settings(Config::default());
        let err = settings
            .set(SettingKey::Species, json!([{"commonNames": ["Zebra"]}]))
            .unwrap_err();
        assert_eq!(err.to_string(), "scientificName field missing from site.species");
        assert_eq!(store.get_value(keys::SPECIES).unwrap(), None);
    }

    #[test]
    fn validate_is_a_dry_run() {
        let (settings, store) = settings(Config::default());
        let categories = json!([{"id": "cat1", "label": "General", "type": "encounter"}]);
        settings
            .validate(SettingKey::CustomFieldCategories, &categories)
            .unwrap();
        assert_eq!(store.get_value(keys::CUSTOM_FIELD_CATEGORIES).unwrap(), None);
    }

    #[test]
    fn custom_fields_go_through_registry() {
        let (settings, _) = settings(Config::default());
        settings
            .set_key(
                "site.custom.customFieldCategories",
                json!([{"id": "cat1", "label": "General", "type": "encounter"}]),
            )
            .unwrap();
        settings
            .set_key(
                "site.custom.customFields.Encounter",
                json!({"definitions": [{
                    "id": "f1",
                    "name": "Count",
                    "schema": {"category": "cat1", "displayType": "integer", "label": "Count"},
                    "multiple": false,
                }]}),
            )
            .unwrap();

        assert!(settings
            .is_valid_value_for_class(ClassName::Encounter, "f1", &json!(4))
            .unwrap());
        assert!(!settings
            .is_valid_value_for_class(ClassName::Encounter, "f1", &json!("four"))
            .unwrap());

        settings
            .patch_remove("site.custom.customFields.Encounter/f1")
            .unwrap();
        assert!(!settings
            .is_valid_value_for_class(ClassName::Encounter, "f1", &json!(4))
            .unwrap());
    }

    #[test]
    fn disabled_module_keys_are_ignored() {
        let mut config = Config::default();
        config.disable_module(Module::SocialGroups);
        config.disable_module(Module::AutogeneratedNames);
        let (settings, store) = settings(config);

        settings.set(SettingKey::SocialGroupRoles, json!("anything")).unwrap();
        settings.set(SettingKey::AutogeneratedNames, json!(42)).unwrap();

        assert_eq!(store.get_value(keys::SOCIAL_GROUP_ROLES).unwrap(), None);
        assert_eq!(store.get_value(keys::AUTOGENERATED_NAMES).unwrap(), None);
    }

    #[test]
    fn enabled_module_keys_are_validated() {
        let (settings, _) = settings(Config::default());
        assert!(settings.set(SettingKey::SocialGroupRoles, json!("anything")).is_err());

        let roles = json!({"Matriarch": {"multipleInGroup": false}});
        settings.set(SettingKey::SocialGroupRoles, roles.clone()).unwrap();
        assert_eq!(settings.get(SettingKey::SocialGroupRoles).unwrap(), Some(roles));
    }

    #[test]
    fn autogenerated_names_read_back_as_rest() {
        let (settings, _) = settings(Config::default());
        let guid = "6a34b8f2-3c1f-4b0e-9d0a-0f1e2d3c4b5a";
        settings
            .set(
                SettingKey::AutogeneratedNames,
                json!({guid: {"type": "auto_region", "prefix": "RG", "start_value": 5}}),
            )
            .unwrap();

        let names = settings.get(SettingKey::AutogeneratedNames).unwrap().unwrap();
        assert_eq!(names[guid]["next_value"], 5);
        assert_eq!(names[guid]["type"], "auto_region");
    }

    #[test]
    fn relationship_type_roles_must_be_an_object() {
        let (settings, _) = settings(Config::default());
        let err = settings
            .set(SettingKey::RelationshipTypeRoles, json!([]))
            .unwrap_err();
        assert_eq!(err.to_string(), "value must be a dict");
    }
}
