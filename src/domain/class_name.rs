//! The domain classes that carry custom fields.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A domain object class that can carry custom fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClassName {
    /// A single animal observed in a sighting.
    Encounter,
    /// An observation event, grouping encounters.
    Sighting,
    /// A known animal, identified across encounters.
    Individual,
}

impl ClassName {
    /// Every supported class.
    pub const ALL: [Self; 3] = [Self::Encounter, Self::Sighting, Self::Individual];

    /// The canonical, capitalised name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encounter => "Encounter",
            Self::Sighting => "Sighting",
            Self::Individual => "Individual",
        }
    }

    /// The lowercase name used for storage tables and category types.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Encounter => "encounter",
            Self::Sighting => "sighting",
            Self::Individual => "individual",
        }
    }

    /// The settings key holding this class's custom field definitions.
    #[must_use]
    pub fn settings_key(self) -> String {
        format!("{}{self}", crate::storage::keys::CUSTOM_FIELDS_PREFIX)
    }

    /// Whether a category `type` string designates this class.
    ///
    /// The comparison ignores ASCII case.
    #[must_use]
    pub fn matches_category_type(self, category_type: &str) -> bool {
        category_type.eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no supported class.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown custom field class '{0}'")]
pub struct UnknownClassError(pub String);

impl FromStr for ClassName {
    type Err = UnknownClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| UnknownClassError(s.to_string()))
    }
}
