//! Declarative shape checks for JSON records.
//!
//! A record is checked against an ordered table of [`FieldSpec`]s. The first
//! violated rule is returned; the record itself is never modified.

use std::fmt;

use serde_json::{Map, Value};

use crate::domain::error::{ConfigurationError, reject};

/// The JSON type a field is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A JSON string.
    String,
    /// A JSON array.
    List,
    /// A JSON object.
    Object,
    /// A JSON boolean.
    Boolean,
    /// An integral JSON number.
    Integer,
}

impl FieldKind {
    /// Returns `true` if `value` has this kind.
    ///
    /// Booleans are never integers, and a number only counts as an integer if
    /// it has no fractional representation.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::List => value.is_array(),
            Self::Object => value.is_object(),
            Self::Boolean => value.is_boolean(),
            Self::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::List => "list",
            Self::Object => "object",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
        };
        f.write_str(name)
    }
}

/// One row of a validation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// The key looked up in the record.
    pub name: &'static str,
    /// The expected JSON type.
    pub kind: FieldKind,
    /// Whether the field must be present (and non-empty for strings and
    /// lists).
    pub mandatory: bool,
}

impl FieldSpec {
    /// A field that must be present.
    #[must_use]
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            mandatory: true,
        }
    }

    /// A field that is type-checked only when present.
    #[must_use]
    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            mandatory: false,
        }
    }
}

/// Checks `record` against `specs`, in order.
///
/// # Errors
///
/// Returns the first violated rule:
///
/// - a mandatory field is missing
/// - a field (mandatory or present optional) has the wrong type
/// - a mandatory list is empty
/// - a mandatory string is empty
pub fn validate_fields(
    record: &Map<String, Value>,
    specs: &[FieldSpec],
    context: &str,
) -> Result<(), ConfigurationError> {
    for spec in specs {
        let value = record.get(spec.name);

        if spec.mandatory {
            let Some(value) = value else {
                return reject(ConfigurationError::MissingField {
                    field: spec.name.to_string(),
                    context: context.to_string(),
                });
            };
            if !spec.kind.matches(value) {
                return reject(ConfigurationError::TypeMismatch {
                    field: spec.name.to_string(),
                    expected: spec.kind,
                    context: context.to_string(),
                });
            }
            if value.as_array().is_some_and(Vec::is_empty) {
                return reject(ConfigurationError::EmptyList {
                    field: spec.name.to_string(),
                    context: context.to_string(),
                });
            }
            if value.as_str().is_some_and(str::is_empty) {
                return reject(ConfigurationError::EmptyString {
                    field: spec.name.to_string(),
                    context: context.to_string(),
                });
            }
        } else if let Some(value) = value {
            if !spec.kind.matches(value) {
                return reject(ConfigurationError::IncorrectType {
                    field: spec.name.to_string(),
                    context: context.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Borrows `value` as a JSON object.
///
/// # Errors
///
/// Returns [`ConfigurationError::NotAnObject`] if `value` is anything else.
pub fn as_object<'a>(
    value: &'a Value,
    context: &str,
) -> Result<&'a Map<String, Value>, ConfigurationError> {
    match value.as_object() {
        Some(object) => Ok(object),
        None => reject(ConfigurationError::NotAnObject {
            context: context.to_string(),
        }),
    }
}

/// Borrows `value` as a JSON array, failing with `message` otherwise.
pub(crate) fn as_list<'a>(
    value: &'a Value,
    message: &str,
) -> Result<&'a [Value], ConfigurationError> {
    match value.as_array() {
        Some(list) => Ok(list),
        None => reject(ConfigurationError::invalid(message)),
    }
}
