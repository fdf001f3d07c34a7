//! The custom-field definition registry.
//!
//! Definitions for a class are one document in the settings store. The
//! registry keeps no state: every call re-reads the document, and every
//! write replaces it whole.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    domain::{
        ClassName, ConfigurationError, CustomFieldCategory, CustomFieldDefinition, DefinitionSet,
        DisplayType,
        fields::{FieldKind, FieldSpec, as_list, as_object, validate_fields},
        is_valid_value, reject,
    },
    settings::{Context, Error, UsageGuard},
    storage::{StoreError, keys},
};

const CATEGORY_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("id", FieldKind::String),
    FieldSpec::required("label", FieldKind::String),
    FieldSpec::required("type", FieldKind::String),
];

const DEFINITION_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("id", FieldKind::String),
    FieldSpec::required("name", FieldKind::String),
    FieldSpec::required("schema", FieldKind::Object),
    FieldSpec::required("multiple", FieldKind::Boolean),
];

const SCHEMA_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("category", FieldKind::String),
    FieldSpec::optional("description", FieldKind::String),
    FieldSpec::required("displayType", FieldKind::String),
    FieldSpec::required("label", FieldKind::String),
];

static PATCH_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^site\.custom\.customFields\.(\w+)/([\w\-]+)$").expect("pattern is valid")
});

/// A definition set that passed validation and is ready to be stored.
///
/// Carries the store version it was validated against; committing fails if
/// the stored set changed since.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDefinitions {
    class: ClassName,
    definitions: DefinitionSet,
    version: Option<u64>,
}

impl ValidatedDefinitions {
    /// The class the definitions belong to.
    #[must_use]
    pub const fn class(&self) -> ClassName {
        self.class
    }

    /// The normalised definitions.
    #[must_use]
    pub const fn definitions(&self) -> &DefinitionSet {
        &self.definitions
    }
}

/// CRUD and validation over per-class custom field definitions.
#[derive(Clone, Copy)]
pub struct CustomFieldRegistry<'a> {
    context: Context<'a>,
}

impl<'a> CustomFieldRegistry<'a> {
    /// Creates a registry over the given collaborators.
    #[must_use]
    pub const fn new(context: Context<'a>) -> Self {
        Self { context }
    }

    fn guard(&self) -> UsageGuard<'a> {
        UsageGuard::new(self.context.objects)
    }

    /// Reads the stored definitions of `class` and the version they were
    /// read at.
    ///
    /// A missing or malformed document reads as an empty set.
    fn load(&self, class: ClassName) -> Result<(DefinitionSet, Option<u64>), StoreError> {
        let Some(entry) = self.context.store.get_versioned(&class.settings_key())? else {
            return Ok((DefinitionSet::default(), None));
        };
        let definitions = serde_json::from_value(entry.value).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed custom field document for {class}: {e}");
            DefinitionSet::default()
        });
        Ok((definitions, Some(entry.version)))
    }

    fn store(
        &self,
        class: ClassName,
        definitions: &DefinitionSet,
        version: Option<u64>,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_value(definitions)?;
        self.context
            .store
            .set_if_version(&class.settings_key(), data, true, version)?;
        Ok(())
    }

    fn load_categories(&self) -> Result<Vec<CustomFieldCategory>, StoreError> {
        let Some(value) = self.context.store.get_value(keys::CUSTOM_FIELD_CATEGORIES)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_value(value).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed custom field categories: {e}");
            Vec::new()
        }))
    }

    /// Looks up one definition.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read. A missing
    /// definition is `Ok(None)`.
    pub fn get_definition(
        &self,
        class: ClassName,
        id: &str,
    ) -> Result<Option<CustomFieldDefinition>, StoreError> {
        let (definitions, _) = self.load(class)?;
        Ok(definitions.get(id).cloned())
    }

    /// Adds a definition, or replaces it if `replace` is set.
    ///
    /// If `id` already exists and `replace` is `false` nothing happens. This
    /// is not an error. Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    #[instrument(skip(self, definition))]
    pub fn add_definition(
        &self,
        class: ClassName,
        id: &str,
        definition: CustomFieldDefinition,
        replace: bool,
    ) -> Result<bool, StoreError> {
        let (mut definitions, version) = self.load(class)?;
        match definitions.definitions.iter_mut().find(|d| d.id == id) {
            Some(_) if !replace => return Ok(false),
            Some(existing) => *existing = definition,
            None => definitions.definitions.push(definition),
        }
        self.store(class, &definitions, version)?;
        self.context
            .audit(&format!("add_definition added {id} to {class}"));
        Ok(true)
    }

    /// Removes a definition without checking whether it is in use.
    ///
    /// Callers must consult the [`UsageGuard`] first;
    /// [`CustomFieldRegistry::patch_remove`] does. Returns whether anything was
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written.
    #[instrument(skip(self))]
    pub fn remove_definition(&self, class: ClassName, id: &str) -> Result<bool, StoreError> {
        let (mut definitions, version) = self.load(class)?;
        let before = definitions.definitions.len();
        definitions.definitions.retain(|d| d.id != id);
        if definitions.definitions.len() == before {
            return Ok(false);
        }
        self.store(class, &definitions, version)?;
        self.context
            .audit(&format!("remove_definition dropped {id} for {class}"));
        Ok(true)
    }

    /// Checks a `customFieldCategories` value.
    ///
    /// # Errors
    ///
    /// Fails if the value is not a list, an entry lacks a non-empty `id`,
    /// `label` or `type`, a `type` names no supported class, or an `id`
    /// repeats.
    pub fn validate_category_set(
        &self,
        value: &Value,
    ) -> Result<Vec<CustomFieldCategory>, ConfigurationError> {
        const CONTEXT: &str = "customFieldCategories";

        let entries = as_list(value, "customFieldCategories needs to be a list")?;
        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(entries.len());
        for entry in entries {
            let record = as_object(entry, CONTEXT)?;
            validate_fields(record, CATEGORY_FIELDS, CONTEXT)?;
            let category = CustomFieldCategory {
                id: string_field(record, "id").to_string(),
                label: string_field(record, "label").to_string(),
                category_type: string_field(record, "type").to_string(),
            };
            if !ClassName::ALL.into_iter().any(|c| category.belongs_to(c)) {
                return reject(ConfigurationError::invalid(format!(
                    "{CONTEXT} type {} not valid",
                    category.category_type
                )));
            }
            if !seen.insert(category.id.clone()) {
                return reject(ConfigurationError::invalid(format!(
                    "{CONTEXT} duplicate id {}",
                    category.id
                )));
            }
            categories.push(category);
        }
        Ok(categories)
    }

    /// Validates a complete `{"definitions": [...]}` document for `class`.
    ///
    /// Nothing is written. Definitions that changed, and stored definitions
    /// missing from `value`, are checked against live data; if any of them is
    /// in use the whole document is rejected.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, or a store error if the current
    /// state cannot be read.
    #[instrument(skip(self, value))]
    pub fn validate_definition_set(
        &self,
        class: ClassName,
        value: &Value,
    ) -> Result<ValidatedDefinitions, Error> {
        let context = format!("customFields.{class}");
        let schema_context = format!("{context} schema");

        let Some(raw_definitions) = value.as_object().and_then(|o| o.get("definitions")) else {
            return reject(ConfigurationError::invalid(format!(
                "{context} must contain a 'definitions' block"
            )));
        };
        let raw_definitions = as_list(raw_definitions, &format!("{context} needs to be a list"))?;

        let categories = self.load_categories()?;
        let category_ids: HashSet<&str> = categories
            .iter()
            .filter(|c| c.belongs_to(class))
            .map(|c| c.id.as_str())
            .collect();
        let (current, version) = self.load(class)?;
        let guard = self.guard();

        let mut seen = HashSet::new();
        let mut definitions = Vec::with_capacity(raw_definitions.len());
        for raw in raw_definitions {
            let record = as_object(raw, &context)?;
            validate_fields(record, DEFINITION_FIELDS, &context)?;
            let schema = as_object(record.get("schema").unwrap_or(&Value::Null), &schema_context)?;
            validate_fields(schema, SCHEMA_FIELDS, &schema_context)?;

            let category = string_field(schema, "category");
            if !category_ids.contains(category) {
                return reject(ConfigurationError::invalid(format!(
                    "{context} category-id {category} not found"
                )));
            }

            let id = string_field(record, "id");
            if !seen.insert(id) {
                return reject(ConfigurationError::invalid(format!(
                    "{context} id {id} appears more than once"
                )));
            }

            let display_type = string_field(schema, "displayType");
            let Ok(display_type) = display_type.parse::<DisplayType>() else {
                return reject(ConfigurationError::invalid(format!(
                    "{context} id {id}: displayType {display_type} not valid"
                )));
            };
            if display_type.requires_choices() {
                validate_choices(
                    schema,
                    &format!("{context} id {id}: displayType {display_type}"),
                )?;
            }

            let definition: CustomFieldDefinition = serde_json::from_value(raw.clone())
                .map_err(|e| ConfigurationError::invalid(format!("{context} id {id}: {e}")))?;
            if current.get(id).is_some_and(|existing| *existing != definition) {
                guard.ensure_unused_for_change(class, id)?;
            }
            definitions.push(definition);
        }

        for dropped in current.ids().filter(|id| !seen.contains(id)) {
            guard.ensure_unused_for_drop(class, dropped)?;
        }

        Ok(ValidatedDefinitions {
            class,
            definitions: DefinitionSet { definitions },
            version,
        })
    }

    /// Stores a validated definition set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionConflict`] if the stored definitions
    /// changed after validation. Nothing is written in that case.
    #[instrument(skip_all, fields(class = %validated.class))]
    pub fn commit_definition_set(&self, validated: ValidatedDefinitions) -> Result<(), Error> {
        self.store(validated.class, &validated.definitions, validated.version)?;
        tracing::info!(
            "Stored {} custom field definitions for {}",
            validated.definitions.definitions.len(),
            validated.class
        );
        Ok(())
    }

    /// Validates an Encounter definition document.
    ///
    /// # Errors
    ///
    /// See [`CustomFieldRegistry::validate_definition_set`].
    pub fn validate_encounters(&self, value: &Value) -> Result<ValidatedDefinitions, Error> {
        self.validate_definition_set(ClassName::Encounter, value)
    }

    /// Validates a Sighting definition document.
    ///
    /// # Errors
    ///
    /// See [`CustomFieldRegistry::validate_definition_set`].
    pub fn validate_sightings(&self, value: &Value) -> Result<ValidatedDefinitions, Error> {
        self.validate_definition_set(ClassName::Sighting, value)
    }

    /// Validates an Individual definition document.
    ///
    /// # Errors
    ///
    /// See [`CustomFieldRegistry::validate_definition_set`].
    pub fn validate_individuals(&self, value: &Value) -> Result<ValidatedDefinitions, Error> {
        self.validate_definition_set(ClassName::Individual, value)
    }

    /// Removes one definition given a patch path of the form
    /// `site.custom.customFields.<Class>/<FieldId>`.
    ///
    /// Replacing a class's whole definition object is deliberately not
    /// possible through this path.
    ///
    /// # Errors
    ///
    /// Fails without touching the store if the path is malformed or names an
    /// unknown class. Fails if the definition does not exist or is in use.
    #[instrument(skip(self))]
    pub fn patch_remove(&self, path: &str) -> Result<(), Error> {
        let Some(captures) = PATCH_PATH.captures(path) else {
            return reject(ConfigurationError::MalformedPatchPath(path.to_string()));
        };
        let class_name = &captures[1];
        let id = &captures[2];
        let Ok(class) = class_name.parse::<ClassName>() else {
            return reject(ConfigurationError::UnknownClass(class_name.to_string()));
        };

        if self.get_definition(class, id)?.is_none() {
            return reject(ConfigurationError::invalid(format!(
                "invalid guid {id} for class {class}"
            )));
        }
        self.guard().ensure_unused_for_drop(class, id)?;
        self.remove_definition(class, id)?;
        Ok(())
    }

    /// Checks `value` against the stored definition `field_id` of `class`.
    ///
    /// Returns `false` if there is no such definition.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read.
    pub fn is_valid_value_for_class(
        &self,
        class: ClassName,
        field_id: &str,
        value: &Value,
    ) -> Result<bool, StoreError> {
        Ok(self
            .get_definition(class, field_id)?
            .is_some_and(|definition| is_valid_value(&definition.value_spec(), value)))
    }
}

/// Reads a string field that [`validate_fields`] already confirmed.
fn string_field<'v>(record: &'v Map<String, Value>, name: &str) -> &'v str {
    record.get(name).and_then(Value::as_str).unwrap_or_default()
}

/// Checks the `choices` of a select or multiselect schema.
fn validate_choices(schema: &Map<String, Value>, prefix: &str) -> Result<(), ConfigurationError> {
    let Some(choices) = schema.get("choices").and_then(Value::as_array) else {
        return reject(ConfigurationError::invalid(format!(
            "{prefix} requires \"choices\" list in schema"
        )));
    };
    if choices.is_empty() {
        return reject(ConfigurationError::invalid(format!(
            "{prefix} requires \"choices\" have at least one value"
        )));
    }

    let mut values: Vec<&Value> = Vec::with_capacity(choices.len());
    for choice in choices {
        let Some(fields) = choice.as_object() else {
            return reject(ConfigurationError::invalid(format!(
                "{prefix} non-object choice: {choice}"
            )));
        };
        if !fields.contains_key("label") {
            return reject(ConfigurationError::invalid(format!(
                "{prefix} choice missing \"label\": {choice}"
            )));
        }
        let Some(value) = fields.get("value") else {
            return reject(ConfigurationError::invalid(format!(
                "{prefix} choice missing \"value\": {choice}"
            )));
        };
        if values.contains(&value) {
            return reject(ConfigurationError::invalid(format!(
                "{prefix} duplicate choice value in: {choice}"
            )));
        }
        values.push(value);
    }
    Ok(())
}
