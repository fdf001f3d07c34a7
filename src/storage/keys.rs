//! Settings keys owned by this crate.

/// Custom field categories, shared by all classes.
pub const CUSTOM_FIELD_CATEGORIES: &str = "site.custom.customFieldCategories";

/// Followed by a class name, e.g. `site.custom.customFields.Encounter`.
pub const CUSTOM_FIELDS_PREFIX: &str = "site.custom.customFields.";

/// The configured species list.
pub const SPECIES: &str = "site.species";

/// Relationship types and their roles.
pub const RELATIONSHIP_TYPE_ROLES: &str = "site.custom.relationshipTypeRoles";

/// Social group roles.
pub const SOCIAL_GROUP_ROLES: &str = "social_group_roles";

/// Autogenerated name counters.
pub const AUTOGENERATED_NAMES: &str = "autogenerated_names";
