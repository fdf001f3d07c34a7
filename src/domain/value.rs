//! Type-checking of custom field values against their definitions.
//!
//! `null` is accepted for every definition. An object may hold
//! `{"<field id>": null}`, which is treated as "no value".

use serde_json::Value;

/// Whether `null` is a valid value regardless of the declared type.
pub const NULL_ALWAYS_VALID: bool = true;

/// The primitive kind a stored value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Text.
    String,
    /// A whole number.
    Integer,
    /// A floating-point number.
    Double,
    /// True or false.
    Boolean,
    /// A JSON object.
    Json,
    /// An RFC 3339 datetime string.
    Date,
    /// A coordinate list.
    Geo,
}

impl ValueType {
    /// Maps a declared `type` string to a value type.
    ///
    /// Unrecognised names fall back to [`ValueType::String`].
    #[must_use]
    pub fn from_declared(declared: &str) -> Self {
        match declared {
            "integer" => Self::Integer,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "json" => Self::Json,
            "date" => Self::Date,
            "geo" => Self::Geo,
            _ => Self::String,
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Double => value.is_f64(),
            Self::Boolean => value.is_boolean(),
            Self::Json => value.is_object(),
            Self::Date => value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
            Self::Geo => value.is_array(),
        }
    }
}

/// What the checker needs to know about a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpec {
    /// The primitive kind of each value.
    pub value_type: ValueType,
    /// Whether the value is a list of such values.
    pub multiple: bool,
}

impl ValueSpec {
    /// Reads a spec from a raw definition object's `type` and `multiple` keys.
    ///
    /// A missing `type` is treated as text and a missing `multiple` as
    /// `false`.
    #[must_use]
    pub fn from_json(definition: &Value) -> Self {
        Self {
            value_type: definition
                .get("type")
                .and_then(Value::as_str)
                .map_or(ValueType::String, ValueType::from_declared),
            multiple: definition
                .get("multiple")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    const fn single(self) -> Self {
        Self {
            multiple: false,
            ..self
        }
    }
}

/// Checks `value` against `spec`.
///
/// Never fails: invalid values yield `false` and a debug log line.
#[must_use]
pub fn is_valid_value(spec: &ValueSpec, value: &Value) -> bool {
    if value.is_null() && NULL_ALWAYS_VALID {
        return true;
    }

    if spec.multiple {
        let Some(values) = value.as_array() else {
            tracing::debug!(%value, ?spec, "multiple=true but value is not a list");
            return false;
        };
        let single = spec.single();
        return values.iter().all(|v| is_valid_value(&single, v));
    }

    let valid = spec.value_type.accepts(value);
    if !valid {
        tracing::debug!(%value, ?spec, "value does not match declared type");
    }
    valid
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    fn spec(value_type: ValueType, multiple: bool) -> ValueSpec {
        ValueSpec {
            value_type,
            multiple,
        }
    }

    #[test]
    fn one_bad_element_fails_a_multiple_value() {
        let definition = json!({"type": "integer", "multiple": true});
        assert!(!is_valid_value(
            &ValueSpec::from_json(&definition),
            &json!([1, 2, "x"])
        ));
        assert!(is_valid_value(
            &ValueSpec::from_json(&definition),
            &json!([1, 2, 3])
        ));
    }

    #[test]
    fn null_is_always_valid() {
        let definition = json!({"type": "integer"});
        assert!(is_valid_value(&ValueSpec::from_json(&definition), &Value::Null));
        assert!(is_valid_value(&spec(ValueType::Geo, true), &Value::Null));
    }

    #[test]
    fn multiple_requires_a_list() {
        assert!(!is_valid_value(&spec(ValueType::Integer, true), &json!(1)));
        assert!(is_valid_value(&spec(ValueType::Integer, true), &json!([])));
    }

    #[test]
    fn null_elements_inside_lists_pass() {
        assert!(is_valid_value(
            &spec(ValueType::String, true),
            &json!(["a", null])
        ));
    }

    #[test_case(ValueType::String, json!("red"), true; "string ok")]
    #[test_case(ValueType::String, json!(3), false; "string rejects number")]
    #[test_case(ValueType::Integer, json!(3), true; "integer ok")]
    #[test_case(ValueType::Integer, json!(3.5), false; "integer rejects float")]
    #[test_case(ValueType::Integer, json!(true), false; "integer rejects bool")]
    #[test_case(ValueType::Double, json!(3.5), true; "double ok")]
    #[test_case(ValueType::Double, json!(3), false; "double rejects integer")]
    #[test_case(ValueType::Boolean, json!(false), true; "boolean ok")]
    #[test_case(ValueType::Json, json!({"time": "x"}), true; "json ok")]
    #[test_case(ValueType::Json, json!([1]), false; "json rejects list")]
    #[test_case(ValueType::Date, json!("2022-01-21T10:00:00Z"), true; "date ok")]
    #[test_case(ValueType::Date, json!("yesterday"), false; "date rejects free text")]
    #[test_case(ValueType::Geo, json!([1.0, 2.0]), true; "geo ok")]
    #[test_case(ValueType::Geo, json!({"lat": 1.0}), false; "geo rejects object")]
    fn single_values(value_type: ValueType, value: Value, expected: bool) {
        assert_eq!(is_valid_value(&spec(value_type, false), &value), expected);
    }

    #[test]
    fn unknown_declared_type_is_text() {
        assert_eq!(ValueType::from_declared("colour"), ValueType::String);
        assert_eq!(
            ValueSpec::from_json(&json!({})),
            spec(ValueType::String, false)
        );
    }
}
