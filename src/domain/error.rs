//! The error type for rejected settings changes.

use std::fmt;

use crate::domain::{ClassName, fields::FieldKind};

/// A rejected configuration change.
///
/// Every validation, structural and usage-guard failure is reported through
/// this one type. Only the first violated rule is reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A mandatory field is absent.
    #[error("{field} field missing from {context}")]
    MissingField {
        /// Name of the missing field.
        field: String,
        /// Where the record came from.
        context: String,
    },

    /// A mandatory field is present but has the wrong JSON type.
    #[error("{field} field had incorrect type, expected {expected} in {context}")]
    TypeMismatch {
        /// Name of the offending field.
        field: String,
        /// The kind the field should have had.
        expected: FieldKind,
        /// Where the record came from.
        context: String,
    },

    /// An optional field is present but has the wrong JSON type.
    #[error("{field} incorrect type in {context}")]
    IncorrectType {
        /// Name of the offending field.
        field: String,
        /// Where the record came from.
        context: String,
    },

    /// A mandatory list field has no entries.
    #[error("{field} in {context} must have at least one entry")]
    EmptyList {
        /// Name of the offending field.
        field: String,
        /// Where the record came from.
        context: String,
    },

    /// A mandatory string field is empty.
    #[error("{field} cannot be empty string in {context}")]
    EmptyString {
        /// Name of the offending field.
        field: String,
        /// Where the record came from.
        context: String,
    },

    /// A list element or document that should be a JSON object is not.
    #[error("{context} entries must be objects")]
    NotAnObject {
        /// Where the value came from.
        context: String,
    },

    /// A custom field definition cannot change because live objects use it.
    #[error(
        "customFields.{class} id {id} in use by {count} objects; cannot be {action}"
    )]
    FieldInUse {
        /// The class owning the definition.
        class: ClassName,
        /// The definition id.
        id: String,
        /// How many live objects hold a value for the field.
        count: usize,
        /// What the caller tried to do.
        action: UsageAction,
    },

    /// The settings key has no registered validator.
    #[error("unknown settings key '{0}'")]
    UnknownKey(String),

    /// The class name is not one of the supported custom-field targets.
    #[error("unknown custom field class '{0}'")]
    UnknownClass(String),

    /// A patch path does not match `site.custom.customFields.<Class>/<Id>`.
    #[error("malformed patch path '{0}'")]
    MalformedPatchPath(String),

    /// Any other violated rule, carrying its user-facing message.
    #[error("{0}")]
    Invalid(String),
}

/// The destructive action a usage check is guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageAction {
    /// The definition content would change.
    Change,
    /// The definition would be removed.
    Drop,
}

impl fmt::Display for UsageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Change => f.write_str("changed"),
            Self::Drop => f.write_str("dropped"),
        }
    }
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::Invalid`].
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Logs the rejection and returns it as an `Err`.
///
/// All rejections pass through here so that they show up in the debug log
/// alongside the module that raised them.
pub(crate) fn reject<T, E: From<ConfigurationError>>(error: ConfigurationError) -> Result<T, E> {
    tracing::debug!(%error, "configuration rejected");
    Err(error.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_use_message_names_count_and_action() {
        let err = ConfigurationError::FieldInUse {
            class: ClassName::Encounter,
            id: "f1".to_string(),
            count: 3,
            action: UsageAction::Drop,
        };
        assert_eq!(
            err.to_string(),
            "customFields.Encounter id f1 in use by 3 objects; cannot be dropped"
        );
    }

    #[test]
    fn type_mismatch_message_names_expected_kind() {
        let err = ConfigurationError::TypeMismatch {
            field: "schema".to_string(),
            expected: FieldKind::Object,
            context: "customFields.Sighting".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "schema field had incorrect type, expected object in customFields.Sighting"
        );
    }
}
