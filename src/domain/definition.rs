//! Custom field definitions as they are stored.
//!
//! A class's definitions live in one document under
//! `site.custom.customFields.<Class>`, shaped `{"definitions": [...]}`.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::value::{ValueSpec, ValueType};

/// How the frontend renders (and stores) a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayType {
    /// Single-line text.
    String,
    /// Multi-line text.
    Longstring,
    /// One value from `schema.choices`.
    Select,
    /// Several values from `schema.choices`.
    Multiselect,
    /// True or false.
    Boolean,
    /// A whole number.
    Integer,
    /// A floating-point number.
    Float,
    /// A datetime.
    Date,
    /// A length, stored in meters.
    Feetmeters,
    /// A pair of dates.
    Daterange,
    /// A datetime with a specificity.
    SpecifiedTime,
    /// A region identifier.
    LocationId,
    /// An uploaded file reference.
    File,
    /// A latitude/longitude pair.
    Latlong,
    /// A reference to an individual.
    Individual,
}

impl DisplayType {
    /// Every supported display type.
    pub const ALL: [Self; 15] = [
        Self::String,
        Self::Longstring,
        Self::Select,
        Self::Multiselect,
        Self::Boolean,
        Self::Integer,
        Self::Float,
        Self::Date,
        Self::Feetmeters,
        Self::Daterange,
        Self::SpecifiedTime,
        Self::LocationId,
        Self::File,
        Self::Latlong,
        Self::Individual,
    ];

    /// The wire name, e.g. `specifiedTime`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Longstring => "longstring",
            Self::Select => "select",
            Self::Multiselect => "multiselect",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Date => "date",
            Self::Feetmeters => "feetmeters",
            Self::Daterange => "daterange",
            Self::SpecifiedTime => "specifiedTime",
            Self::LocationId => "locationId",
            Self::File => "file",
            Self::Latlong => "latlong",
            Self::Individual => "individual",
        }
    }

    /// Whether the schema must carry a `choices` list.
    #[must_use]
    pub const fn requires_choices(self) -> bool {
        matches!(self, Self::Select | Self::Multiselect)
    }

    /// The stored value type implied by this display type.
    #[must_use]
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Integer => ValueType::Integer,
            Self::Float | Self::Feetmeters => ValueType::Double,
            Self::Boolean => ValueType::Boolean,
            Self::Date => ValueType::Date,
            Self::SpecifiedTime => ValueType::Json,
            Self::Latlong => ValueType::Geo,
            _ => ValueType::String,
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|t| t.as_str() == s).ok_or(())
    }
}

/// One option of a select or multiselect field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    /// What the user sees.
    pub label: Value,
    /// What gets stored.
    pub value: Value,
}

/// The `schema` block of a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Id of the [`CustomFieldCategory`](crate::domain::CustomFieldCategory)
    /// this field is filed under.
    pub category: String,
    /// Optional help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// How the field is rendered.
    pub display_type: DisplayType,
    /// Field label shown in forms.
    pub label: String,
    /// Any further keys the frontend attached, `choices` included. Kept
    /// verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldSchema {
    /// The allowed values of a select or multiselect field.
    ///
    /// `None` for other display types, whatever `choices` holds, and for a
    /// `choices` entry that is not a list of choices.
    #[must_use]
    pub fn choices(&self) -> Option<Vec<Choice>> {
        if !self.display_type.requires_choices() {
            return None;
        }
        serde_json::from_value(self.extra.get("choices")?.clone()).ok()
    }
}

/// An admin-defined, typed attribute for one domain class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    /// Stable identifier, never reused. Values on objects are keyed by it.
    pub id: String,
    /// Internal name.
    pub name: String,
    /// Rendering and grouping information.
    pub schema: FieldSchema,
    /// Whether the stored value is a list of values.
    pub multiple: bool,
    /// Explicit stored value type, overriding the one implied by
    /// `schema.displayType`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    /// Any further top-level keys, e.g. `required` or `default`. Kept
    /// verbatim and compared like the rest of the definition.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomFieldDefinition {
    /// The type-checking rule for values of this field.
    #[must_use]
    pub fn value_spec(&self) -> ValueSpec {
        let value_type = self.value_type.as_deref().map_or_else(
            || self.schema.display_type.value_type(),
            ValueType::from_declared,
        );
        ValueSpec {
            value_type,
            multiple: self.multiple,
        }
    }
}

/// The stored document for one class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionSet {
    /// All live definitions, in submission order.
    pub definitions: Vec<CustomFieldDefinition>,
}

impl DefinitionSet {
    /// Looks up a definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CustomFieldDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Iterates over the definition ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.id.as_str())
    }
}
