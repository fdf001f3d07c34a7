//! This bench validates a large custom field definition document against a
//! store that already holds it, with live data on some of the fields.

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use houston_settings::{
    ClassName, MemoryObjects, MemoryStore, RecordingAudit, SettingsStore,
    settings::{Context, CustomFieldRegistry},
    storage::keys,
};
use serde_json::{Value, json};
use uuid::Uuid;

const FIELDS: usize = 500;

fn definitions(label: &str) -> Value {
    let definitions: Vec<Value> = (0..FIELDS)
        .map(|i| {
            json!({
                "id": format!("field-{i}"),
                "name": format!("Field {i}"),
                "schema": {
                    "category": "cat1",
                    "displayType": "select",
                    "label": format!("{label} {i}"),
                    "choices": [
                        {"label": "Yes", "value": "y"},
                        {"label": "No", "value": "n"},
                    ],
                },
                "multiple": false,
            })
        })
        .collect();
    json!({ "definitions": definitions })
}

fn validate_definitions(c: &mut Criterion) {
    let store = MemoryStore::new();
    store
        .set(
            keys::CUSTOM_FIELD_CATEGORIES,
            json!([{"id": "cat1", "label": "General", "type": "encounter"}]),
            true,
        )
        .unwrap();
    store
        .set(&ClassName::Encounter.settings_key(), definitions("Old"), true)
        .unwrap();

    // every tenth field holds data; the document is resubmitted unchanged
    let objects = MemoryObjects::new();
    for i in (0..FIELDS).step_by(10) {
        let mut fields = serde_json::Map::new();
        fields.insert(format!("field-{i}"), json!("y"));
        objects.insert(ClassName::Encounter, Uuid::new_v4(), fields);
    }
    let audit = RecordingAudit::new();
    let registry = CustomFieldRegistry::new(Context {
        store: &store,
        objects: &objects,
        audit: &audit,
        actor: None,
    });
    let document = definitions("Old");

    c.bench_function("validate definition set", |b| {
        b.iter(|| {
            registry
                .validate_definition_set(ClassName::Encounter, black_box(&document))
                .unwrap()
        });
    });
}

criterion_group!(benches, validate_definitions);
criterion_main!(benches);
