//! Domain types and pure validation rules.
//!
//! Nothing in here touches storage: the field validator and the value
//! type-checker are plain functions over JSON, and the definition types are
//! the normalised, stored shapes.

/// Prefixed name counters.
pub mod autogen;

mod category;
pub use category::CustomFieldCategory;

mod class_name;
pub use class_name::{ClassName, UnknownClassError};

mod config;
pub use config::{Config, Module};

/// Stored custom field definitions.
pub mod definition;
pub use definition::{Choice, CustomFieldDefinition, DefinitionSet, DisplayType, FieldSchema};

mod error;
pub(crate) use error::reject;
pub use error::{ConfigurationError, UsageAction};

/// Shape checks for JSON records.
pub mod fields;

/// Type-checking of custom field values.
pub mod value;
pub use value::{ValueSpec, ValueType, is_valid_value};
