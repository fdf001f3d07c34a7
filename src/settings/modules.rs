//! Validators for the settings keys owned by other modules: species, social
//! group roles and relationship type roles.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::{
    ConfigurationError,
    fields::{FieldKind, FieldSpec, as_list, as_object, validate_fields},
    reject,
};

const SPECIES_CONTEXT: &str = "site.species";

const SPECIES_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("commonNames", FieldKind::List),
    FieldSpec::required("scientificName", FieldKind::String),
    FieldSpec::optional("itisTsn", FieldKind::Integer),
];

const SOCIAL_GROUP_ROLE_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("multipleInGroup", FieldKind::Boolean)];

const RELATIONSHIP_TYPE_FIELDS: &[FieldSpec] = &[
    FieldSpec::optional("guid", FieldKind::String),
    FieldSpec::required("label", FieldKind::String),
    FieldSpec::required("roles", FieldKind::List),
];

const RELATIONSHIP_ROLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("guid", FieldKind::String),
    FieldSpec::required("label", FieldKind::String),
];

/// Checks a `site.species` list.
///
/// # Errors
///
/// Fails if the value is not a list or an entry lacks a usable
/// `commonNames` or `scientificName`.
pub fn validate_species(value: &Value) -> Result<(), ConfigurationError> {
    for species in as_list(value, "site.species needs to be a list")? {
        validate_fields(as_object(species, SPECIES_CONTEXT)?, SPECIES_FIELDS, SPECIES_CONTEXT)?;
    }
    Ok(())
}

/// Gives every species entry without an `id` a fresh one.
///
/// Existing ids are kept. Non-object entries are left alone.
#[must_use]
pub fn assign_species_ids(mut value: Value) -> Value {
    if let Some(entries) = value.as_array_mut() {
        for species in entries.iter_mut().filter_map(Value::as_object_mut) {
            species
                .entry("id")
                .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        }
    }
    value
}

/// Checks a social group roles object of role name to
/// `{"multipleInGroup": bool}`.
///
/// # Errors
///
/// Fails if the value or any role is not an object, or a role lacks a
/// boolean `multipleInGroup`.
pub fn validate_social_group_roles(value: &Value) -> Result<(), ConfigurationError> {
    let roles = as_object(value, "social_group_roles")?;
    for (name, role) in roles {
        let context = format!("social_group_roles role {name}");
        validate_fields(as_object(role, &context)?, SOCIAL_GROUP_ROLE_FIELDS, &context)?;
    }
    Ok(())
}

/// Checks a relationship type roles object.
///
/// Each relationship type is an object with a `label`, an optional `guid`
/// and a non-empty `roles` list of `{guid, label}` objects.
///
/// # Errors
///
/// Fails with "value must be a dict" if the value is not an object, or with
/// the first problem found in a relationship type.
pub fn validate_relationship_type_roles(value: &Value) -> Result<(), ConfigurationError> {
    let Some(types) = value.as_object() else {
        return reject(ConfigurationError::invalid("value must be a dict"));
    };
    for (name, relationship) in types {
        validate_relationship_type(name, relationship)?;
    }
    Ok(())
}

fn validate_relationship_type(name: &str, relationship: &Value) -> Result<(), ConfigurationError> {
    let context = format!("relationship type {name}");
    let fields: &Map<String, Value> = as_object(relationship, &context)?;
    validate_fields(fields, RELATIONSHIP_TYPE_FIELDS, &context)?;

    let roles_context = format!("{context} roles");
    for role in fields.get("roles").and_then(Value::as_array).into_iter().flatten() {
        validate_fields(
            as_object(role, &roles_context)?,
            RELATIONSHIP_ROLE_FIELDS,
            &roles_context,
        )?;
    }
    Ok(())
}
