//! Named, prefixed counters used to generate human-facing names.
//!
//! Each [`AutogeneratedName`] hands out zero-padded values (`0000`, `0001`,
//! ...) shown as `<prefix>-<value>`. Once created, a name's type, prefix and
//! reference can never change and the name can never be removed.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shortest allowed prefix, in characters.
pub const PREFIX_MIN_LENGTH: usize = 2;
/// Longest allowed prefix, in characters.
pub const PREFIX_MAX_LENGTH: usize = 10;
/// Name contexts referring to a counter start with this, followed by its guid.
pub const CONTEXT_PREFIX: &str = "autogen-";

/// Width values are zero-padded to.
const VALUE_WIDTH: usize = 4;

/// What a counter is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutogeneratedNameType {
    /// One counter per species.
    AutoSpecies,
    /// One counter per region.
    AutoRegion,
    /// One counter per project.
    AutoProject,
    /// One counter per organization.
    AutoOrganization,
}

impl AutogeneratedNameType {
    /// Every supported type.
    pub const ALL: [Self; 4] = [
        Self::AutoSpecies,
        Self::AutoRegion,
        Self::AutoProject,
        Self::AutoOrganization,
    ];

    /// The wire name, e.g. `auto_species`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AutoSpecies => "auto_species",
            Self::AutoRegion => "auto_region",
            Self::AutoProject => "auto_project",
            Self::AutoOrganization => "auto_organization",
        }
    }
}

impl fmt::Display for AutogeneratedNameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unsupported counter type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Type {0} not supported")]
pub struct UnsupportedTypeError(pub String);

impl FromStr for AutogeneratedNameType {
    type Err = UnsupportedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnsupportedTypeError(s.to_string()))
    }
}

/// A persisted counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutogeneratedName {
    /// Stable identifier.
    pub guid: Uuid,
    /// What the counter is scoped to.
    #[serde(rename = "type")]
    pub name_type: AutogeneratedNameType,
    /// Shown before each value.
    pub prefix: String,
    /// The species, region, etc. the counter belongs to.
    #[serde(default)]
    pub reference_guid: Option<Uuid>,
    /// The value the next call to `get_next` hands out.
    #[serde(default)]
    pub next_value: u64,
}

impl AutogeneratedName {
    /// Formats a counter value the way it is handed out.
    #[must_use]
    pub fn format_value(value: u64) -> String {
        format!("{value:0width$}", width = VALUE_WIDTH)
    }

    /// The human-facing form of `value` for this counter.
    #[must_use]
    pub fn display_value(&self, value: &str) -> String {
        format!("{}-{value}", self.prefix)
    }
}

/// Whether `prefix` has an allowed length.
#[must_use]
pub fn prefix_length_ok(prefix: &str) -> bool {
    (PREFIX_MIN_LENGTH..=PREFIX_MAX_LENGTH).contains(&prefix.chars().count())
}

/// All counters, keyed by guid.
///
/// This is the document stored under the `autogenerated_names` key.
pub type NameRegistry = BTreeMap<Uuid, AutogeneratedName>;
