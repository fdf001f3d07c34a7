//! Persistence and validation of autogenerated-name counters.

use serde_json::{Map, Value, json};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    domain::{
        ConfigurationError,
        autogen::{
            AutogeneratedName, AutogeneratedNameType, CONTEXT_PREFIX, NameRegistry,
            PREFIX_MAX_LENGTH, PREFIX_MIN_LENGTH, prefix_length_ok,
        },
        reject,
    },
    settings::{Context, Error},
    storage::{StoreError, keys},
};

/// One entry of a submitted registry, parsed but not yet checked against
/// the stored counters.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NameRequest {
    guid: Uuid,
    name_type: AutogeneratedNameType,
    prefix: String,
    reference_given: bool,
    reference_guid: Option<Uuid>,
    start_value: Option<u64>,
    next_value: Option<u64>,
}

impl NameRequest {
    fn parse(key: &str, entry: &Value) -> Result<Self, ConfigurationError> {
        let Ok(guid) = key.parse::<Uuid>() else {
            return reject(ConfigurationError::invalid(format!(
                "Invalid autogenerated name guid {key}"
            )));
        };
        let fields = entry.as_object();
        let name_type = fields.and_then(|f| f.get("type")).and_then(Value::as_str);
        let prefix = fields.and_then(|f| f.get("prefix")).and_then(Value::as_str);
        let (Some(fields), Some(name_type), Some(prefix)) = (fields, name_type, prefix) else {
            return reject(ConfigurationError::invalid(
                "All autogenerated names need a type and a prefix",
            ));
        };

        if !prefix_length_ok(prefix) {
            return reject(ConfigurationError::invalid(format!(
                "Prefix {prefix} invalid, must be between {PREFIX_MIN_LENGTH} and \
                 {PREFIX_MAX_LENGTH} characters long"
            )));
        }
        let name_type = match name_type.parse::<AutogeneratedNameType>() {
            Ok(name_type) => name_type,
            Err(e) => return reject(ConfigurationError::invalid(e.to_string())),
        };

        let reference_guid = match fields.get("reference_guid") {
            None | Some(Value::Null) => None,
            Some(raw) => match raw.as_str().map(str::parse::<Uuid>) {
                Some(Ok(reference)) => Some(reference),
                _ => {
                    return reject(ConfigurationError::invalid(format!(
                        "Invalid reference guid {raw} for autogenerated name {guid}"
                    )));
                }
            },
        };

        Ok(Self {
            guid,
            name_type,
            prefix: prefix.to_string(),
            reference_given: fields.contains_key("reference_guid"),
            reference_guid,
            start_value: counter(fields, "start_value", guid)?,
            next_value: counter(fields, "next_value", guid)?,
        })
    }
}

/// Largest value a counter may hold.
const MAX_COUNTER: u64 = i64::MAX.unsigned_abs();

fn counter(
    fields: &Map<String, Value>,
    name: &str,
    guid: Uuid,
) -> Result<Option<u64>, ConfigurationError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => match raw.as_u64().filter(|value| *value <= MAX_COUNTER) {
            Some(value) => Ok(Some(value)),
            None => reject(ConfigurationError::invalid(format!(
                "{name} of autogenerated name {guid} must be an integer between 0 and \
                 {MAX_COUNTER}"
            ))),
        },
    }
}

fn describe(reference: Option<Uuid>) -> String {
    reference.map_or_else(|| "none".to_string(), |guid| guid.to_string())
}

/// Checks submitted entries against the stored counters.
///
/// Stored counters are append-only: each must still be present with the same
/// type, prefix and reference, and its value can only move forward.
fn check_against_existing(
    requests: &[NameRequest],
    existing: &NameRegistry,
) -> Result<(), ConfigurationError> {
    for name in existing.values() {
        let Some(request) = requests.iter().find(|r| r.guid == name.guid) else {
            return reject(ConfigurationError::invalid(format!(
                "Cannot remove existing autogen name type:{} prefix:{}",
                name.name_type, name.prefix
            )));
        };
        let same_pair = requests
            .iter()
            .filter(|r| r.name_type == name.name_type && r.prefix == name.prefix)
            .count();
        if same_pair > 1 {
            return reject(ConfigurationError::invalid(format!(
                "Cannot create an additional autogenerated name for type:{}, prefix:{}",
                name.name_type, name.prefix
            )));
        }
        if request.name_type != name.name_type {
            return reject(ConfigurationError::invalid(format!(
                "Cannot change type of existing autogen name guid {}, type:{}",
                name.guid, name.name_type
            )));
        }
        if request.prefix != name.prefix {
            return reject(ConfigurationError::invalid(format!(
                "Cannot change prefix of existing autogen name guid {}, prefix:{}",
                name.guid, name.prefix
            )));
        }
        if request.reference_given && request.reference_guid != name.reference_guid {
            return reject(ConfigurationError::invalid(format!(
                "Cannot change reference guid of existing autogen name guid {}, reference guid:{}",
                name.guid,
                describe(name.reference_guid)
            )));
        }
        if request.start_value.is_some_and(|start| start < name.next_value) {
            return reject(ConfigurationError::invalid(format!(
                "Cannot lower start value of existing autogen name guid {}, next_value:{}",
                name.guid, name.next_value
            )));
        }
    }
    Ok(())
}

/// The autogenerated-name counters of a site.
#[derive(Clone, Copy)]
pub struct AutogeneratedNames<'a> {
    context: Context<'a>,
}

impl<'a> AutogeneratedNames<'a> {
    /// Creates the service over the given collaborators.
    #[must_use]
    pub const fn new(context: Context<'a>) -> Self {
        Self { context }
    }

    fn load(&self) -> Result<(NameRegistry, Option<u64>), StoreError> {
        let Some(entry) = self.context.store.get_versioned(keys::AUTOGENERATED_NAMES)? else {
            return Ok((NameRegistry::new(), None));
        };
        Ok((serde_json::from_value(entry.value)?, Some(entry.version)))
    }

    fn save(&self, names: &NameRegistry, version: Option<u64>) -> Result<(), StoreError> {
        let data = serde_json::to_value(names)?;
        self.context
            .store
            .set_if_version(keys::AUTOGENERATED_NAMES, data, false, version)?;
        Ok(())
    }

    fn checked_requests(
        &self,
        value: &Value,
    ) -> Result<(Vec<NameRequest>, NameRegistry, Option<u64>), Error> {
        let Some(entries) = value.as_object() else {
            return reject(ConfigurationError::invalid(
                "autogenerated_names must be an object",
            ));
        };
        let requests = entries
            .iter()
            .map(|(key, entry)| NameRequest::parse(key, entry))
            .collect::<Result<Vec<_>, _>>()?;
        let (existing, version) = self.load()?;
        check_against_existing(&requests, &existing)?;
        Ok((requests, existing, version))
    }

    /// Returns every stored counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn all(&self) -> Result<NameRegistry, StoreError> {
        Ok(self.load()?.0)
    }

    /// Checks a submitted registry without storing it.
    ///
    /// # Errors
    ///
    /// Returns the first problem found in the document, or a store error.
    #[instrument(skip_all)]
    pub fn validate_names(&self, value: &Value) -> Result<(), Error> {
        self.checked_requests(value).map(|_| ())
    }

    /// Applies a submitted registry.
    ///
    /// The document is checked again before anything is written, so a
    /// counter that moved since [`AutogeneratedNames::validate_names`] is not
    /// rolled back.
    ///
    /// # Errors
    ///
    /// Fails if the document is invalid, or with
    /// [`StoreError::VersionConflict`] if the registry changed while this
    /// call was running.
    #[instrument(skip_all)]
    pub fn set_names_as_rest(&self, value: &Value) -> Result<(), Error> {
        let (requests, mut names, version) = self.checked_requests(value)?;
        let mut created = Vec::new();
        for request in requests {
            if let Some(existing) = names.get_mut(&request.guid) {
                if let Some(start) = request.start_value {
                    existing.next_value = start;
                }
                continue;
            }
            let name = AutogeneratedName {
                guid: request.guid,
                name_type: request.name_type,
                prefix: request.prefix,
                reference_guid: request.reference_guid,
                next_value: request
                    .next_value
                    .or(request.start_value)
                    .unwrap_or_default(),
            };
            created.push(format!(
                "Created AutogeneratedName guid {} type:{} prefix:{}",
                name.guid, name.name_type, name.prefix
            ));
            names.insert(name.guid, name);
        }
        self.save(&names, version)?;
        for message in created {
            self.context.audit(&message);
        }
        Ok(())
    }

    /// Hands out the next value of counter `guid`, zero-padded.
    ///
    /// # Errors
    ///
    /// Fails if there is no such counter, or with
    /// [`StoreError::VersionConflict`] if another writer advanced the
    /// registry concurrently. In that case no value is handed out.
    #[instrument(skip(self))]
    pub fn get_next(&self, guid: Uuid) -> Result<String, Error> {
        let (mut names, version) = self.load()?;
        let Some(name) = names.get_mut(&guid) else {
            return reject(ConfigurationError::invalid(format!(
                "No autogenerated name with guid {guid}"
            )));
        };
        let value = name.next_value;
        let Some(next) = value.checked_add(1).filter(|next| *next <= MAX_COUNTER) else {
            return reject(ConfigurationError::invalid(format!(
                "Autogenerated name {guid} has no values left"
            )));
        };
        name.next_value = next;
        self.save(&names, version)?;
        Ok(AutogeneratedName::format_value(value))
    }

    /// Turns a stored name into its human-facing form.
    ///
    /// Names whose context does not refer to a counter are returned as they
    /// are. Returns `None` if the referenced counter does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn resolve_value(&self, context: &str, value: &str) -> Result<Option<String>, StoreError> {
        let Some(reference) = context.strip_prefix(CONTEXT_PREFIX) else {
            return Ok(Some(value.to_string()));
        };
        let name = match reference.parse::<Uuid>() {
            Ok(guid) => self.load()?.0.remove(&guid),
            Err(_) => None,
        };
        let Some(name) = name else {
            tracing::warn!("No matching AutogeneratedName for {context}:{value}");
            return Ok(None);
        };
        Ok(Some(name.display_value(value)))
    }

    /// The registry as returned to API clients.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn names_as_rest(&self) -> Result<Value, StoreError> {
        let names = self
            .all()?
            .into_values()
            .map(|name| {
                let body = json!({
                    "type": name.name_type,
                    "prefix": name.prefix,
                    "reference_guid": name.reference_guid,
                    "next_value": name.next_value,
                });
                (name.guid.to_string(), body)
            })
            .collect::<Map<_, _>>();
        Ok(Value::Object(names))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::{
        audit::RecordingAudit,
        storage::{MemoryObjects, MemoryStore, SettingsStore},
    };

    const GUID: &str = "6a34b8f2-3c1f-4b0e-9d0a-0f1e2d3c4b5a";
    const OTHER: &str = "0e9a1c44-7d5e-4c43-8b5e-3a7f9c2d1e60";

    struct Fixture {
        store: MemoryStore,
        objects: MemoryObjects,
        audit: RecordingAudit,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                objects: MemoryObjects::new(),
                audit: RecordingAudit::new(),
            }
        }

        fn names(&self) -> AutogeneratedNames<'_> {
            AutogeneratedNames::new(Context {
                store: &self.store,
                objects: &self.objects,
                audit: &self.audit,
                actor: None,
            })
        }

        fn with_species_counter() -> Self {
            let fx = Self::new();
            fx.names()
                .set_names_as_rest(&json!({GUID: {"type": "auto_species", "prefix": "SP"}}))
                .unwrap();
            fx
        }
    }

    fn message(result: Result<(), Error>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn short_prefix_is_rejected() {
        let fx = Fixture::new();
        let err = message(
            fx.names()
                .validate_names(&json!({GUID: {"type": "auto_species", "prefix": "a"}})),
        );
        assert_eq!(
            err,
            "Prefix a invalid, must be between 2 and 10 characters long"
        );
    }

    #[test_case(json!([]), "autogenerated_names must be an object"; "not an object")]
    #[test_case(json!({GUID: {"prefix": "SP"}}), "All autogenerated names need a type and a prefix"; "missing type")]
    #[test_case(json!({GUID: {"type": "auto_moon", "prefix": "SP"}}), "Type auto_moon not supported"; "unknown type")]
    #[test_case(json!({"not-a-guid": {"type": "auto_region", "prefix": "SP"}}), "Invalid autogenerated name guid not-a-guid"; "bad guid")]
    fn malformed_documents_are_rejected(value: Value, expected: &str) {
        let fx = Fixture::new();
        assert_eq!(message(fx.names().validate_names(&value)), expected);
    }

    #[test]
    fn validation_does_not_write() {
        let fx = Fixture::new();
        fx.names()
            .validate_names(&json!({GUID: {"type": "auto_species", "prefix": "SP"}}))
            .unwrap();
        assert_eq!(fx.store.get_value(keys::AUTOGENERATED_NAMES).unwrap(), None);
    }

    #[test]
    fn new_counter_is_created_private_and_audited() {
        let fx = Fixture::with_species_counter();

        assert_eq!(
            fx.store.is_public(keys::AUTOGENERATED_NAMES).unwrap(),
            Some(false)
        );
        assert_eq!(
            fx.audit.messages(),
            vec![format!(
                "Created AutogeneratedName guid {GUID} type:auto_species prefix:SP"
            )]
        );
        assert_eq!(
            fx.names().names_as_rest().unwrap(),
            json!({GUID: {
                "type": "auto_species",
                "prefix": "SP",
                "reference_guid": null,
                "next_value": 0,
            }})
        );
    }

    #[test]
    fn get_next_is_monotonic_and_padded() {
        let fx = Fixture::with_species_counter();
        let guid: Uuid = GUID.parse().unwrap();
        let names = fx.names();

        let handed_out: Vec<String> = (0..3).map(|_| names.get_next(guid).unwrap()).collect();
        assert_eq!(handed_out, ["0000", "0001", "0002"]);
        assert_eq!(names.all().unwrap()[&guid].next_value, 3);
    }

    #[test]
    fn counters_beyond_the_integer_range_are_rejected() {
        let fx = Fixture::new();
        let err = message(fx.names().validate_names(
            &json!({GUID: {"type": "auto_species", "prefix": "SP", "start_value": u64::MAX}}),
        ));
        assert!(err.starts_with("start_value of autogenerated name"), "{err}");
    }

    #[test]
    fn exhausted_counter_hands_out_nothing() {
        let fx = Fixture::new();
        let guid: Uuid = GUID.parse().unwrap();
        let names = fx.names();
        names
            .set_names_as_rest(
                &json!({GUID: {"type": "auto_species", "prefix": "SP", "start_value": i64::MAX}}),
            )
            .unwrap();

        let err = names.get_next(guid).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Autogenerated name {GUID} has no values left")
        );
        assert_eq!(names.all().unwrap()[&guid].next_value, MAX_COUNTER);
    }

    #[test]
    fn get_next_on_unknown_counter_fails() {
        let fx = Fixture::new();
        assert!(fx.names().get_next(Uuid::new_v4()).is_err());
    }

    #[test]
    fn counters_cannot_be_removed() {
        let fx = Fixture::with_species_counter();
        let err = message(fx.names().validate_names(&json!({})));
        assert_eq!(
            err,
            "Cannot remove existing autogen name type:auto_species prefix:SP"
        );
    }

    #[test]
    fn counters_cannot_be_duplicated() {
        let fx = Fixture::with_species_counter();
        let err = message(fx.names().validate_names(&json!({
            GUID: {"type": "auto_species", "prefix": "SP"},
            OTHER: {"type": "auto_species", "prefix": "SP"},
        })));
        assert!(err.starts_with("Cannot create an additional"), "{err}");
    }

    #[test]
    fn type_prefix_and_reference_are_fixed() {
        let fx = Fixture::with_species_counter();
        let names = fx.names();

        let err = message(
            names.validate_names(&json!({GUID: {"type": "auto_region", "prefix": "SP"}})),
        );
        assert!(err.starts_with("Cannot change type"), "{err}");

        let err = message(
            names.validate_names(&json!({GUID: {"type": "auto_species", "prefix": "XX"}})),
        );
        assert!(err.starts_with("Cannot change prefix"), "{err}");

        let err = message(names.validate_names(&json!({GUID: {
            "type": "auto_species",
            "prefix": "SP",
            "reference_guid": OTHER,
        }})));
        assert!(err.starts_with("Cannot change reference guid"), "{err}");
    }

    #[test]
    fn start_value_can_only_move_forward() {
        let fx = Fixture::with_species_counter();
        let guid: Uuid = GUID.parse().unwrap();
        let names = fx.names();
        names.get_next(guid).unwrap();
        names.get_next(guid).unwrap();

        let err = message(names.validate_names(
            &json!({GUID: {"type": "auto_species", "prefix": "SP", "start_value": 1}}),
        ));
        assert!(err.starts_with("Cannot lower start value"), "{err}");

        names
            .set_names_as_rest(
                &json!({GUID: {"type": "auto_species", "prefix": "SP", "start_value": 10}}),
            )
            .unwrap();
        assert_eq!(names.get_next(guid).unwrap(), "0010");
    }

    #[test]
    fn resubmitting_without_start_value_keeps_counter() {
        let fx = Fixture::with_species_counter();
        let guid: Uuid = GUID.parse().unwrap();
        let names = fx.names();
        names.get_next(guid).unwrap();

        names
            .set_names_as_rest(&json!({GUID: {"type": "auto_species", "prefix": "SP"}}))
            .unwrap();
        assert_eq!(names.get_next(guid).unwrap(), "0001");
    }

    #[test]
    fn stale_registry_write_is_rejected() {
        let fx = Fixture::with_species_counter();
        let guid: Uuid = GUID.parse().unwrap();
        let entry = fx.store.get_versioned(keys::AUTOGENERATED_NAMES).unwrap().unwrap();
        fx.names().get_next(guid).unwrap();

        // a writer holding the earlier version must not hand out 0000 again
        let conflict = fx.store.set_if_version(
            keys::AUTOGENERATED_NAMES,
            entry.value,
            false,
            Some(entry.version),
        );
        assert!(matches!(conflict, Err(StoreError::VersionConflict { .. })));
        assert_eq!(fx.names().get_next(guid).unwrap(), "0001");
    }

    #[test]
    fn values_resolve_through_context() {
        let fx = Fixture::with_species_counter();
        let names = fx.names();

        assert_eq!(
            names.resolve_value(&format!("autogen-{GUID}"), "0007").unwrap(),
            Some("SP-0007".to_string())
        );
        assert_eq!(
            names.resolve_value("FirstName", "Zebby").unwrap(),
            Some("Zebby".to_string())
        );
        assert_eq!(
            names.resolve_value(&format!("autogen-{OTHER}"), "0007").unwrap(),
            None
        );
    }
}
