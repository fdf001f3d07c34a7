//! Custom field categories.

use serde::{Deserialize, Serialize};

use crate::domain::ClassName;

/// A UI grouping that custom field definitions are filed under.
///
/// Stored as one list under `site.custom.customFieldCategories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldCategory {
    /// Identifier referenced by `schema.category` in definitions.
    pub id: String,
    /// Human-readable name.
    pub label: String,
    /// The class this category belongs to, in lowercase (e.g. `encounter`).
    #[serde(rename = "type")]
    pub category_type: String,
}

impl CustomFieldCategory {
    /// Whether this category may hold definitions for `class`.
    #[must_use]
    pub fn belongs_to(&self, class: ClassName) -> bool {
        class.matches_category_type(&self.category_type)
    }
}
