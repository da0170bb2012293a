use std::sync::Arc;

use serde_json::{json, Value};
use tasking_domain::{
    Document, DecodeError, ExtensionCatalog, FieldSet, FieldSpec, FieldType, TaskTypeName,
    TaskTypeRecord, TaskTypeRegistry, TaskingError, Window, WindowCodec, WindowState,
};

fn foo_record() -> TaskTypeRecord {
    TaskTypeRecord::new("foo")
        .with_extension("symbol_set", Value::Null)
        .with_extension("keynonce", json!({"key_len": 12, "nonce_len": 12}))
}

fn foo_registry() -> Arc<TaskTypeRegistry> {
    let mut registry = TaskTypeRegistry::default();
    let report = registry.initialize(vec![foo_record()]);
    assert!(report.is_clean());
    Arc::new(registry)
}

fn foo_params(key: &str) -> Value {
    json!({
        "start_time": "2024-05-01T12:00:00Z",
        "stop_time": "2024-05-01T12:30:00Z",
        "datasources": ["radar"],
        "symbol_set": 7,
        "key": key,
        "nonce": "abcdefabcdef",
    })
}

#[test]
fn test_task_type_name_cases() {
    for valid in ["a1", "a_1", "abc", &"a".repeat(16)] {
        assert!(TaskTypeName::parse(valid).is_ok(), "{valid}");
    }
    for invalid in ["a", "A1", &"a".repeat(17), "a_", "1_a", "a-1"] {
        assert!(
            matches!(
                TaskTypeName::parse(invalid),
                Err(TaskingError::InvalidTaskTypeName { .. })
            ),
            "{invalid}"
        );
    }
}

#[test]
fn test_foo_schema_field_set() {
    let registry = foo_registry();
    let schema = registry.lookup("foo").unwrap();

    let mut fields: Vec<&str> = schema.field_names().collect();
    fields.sort_unstable();
    assert_eq!(
        fields,
        vec![
            "datasources",
            "key",
            "nonce",
            "start_time",
            "stop_time",
            "symbol_set",
            "task_type"
        ]
    );
    assert_eq!(
        schema.field("task_type").unwrap().spec.fixed_value(),
        Some("foo")
    );
}

#[test]
fn test_keynonce_length_constraint() {
    let schema = foo_registry().lookup("foo").unwrap();

    assert!(schema.validate(&foo_params("0123456789ab")).is_ok());

    let err = schema.validate(&foo_params("0123456789abc")).unwrap_err();
    assert!(matches!(
        err,
        TaskingError::FieldConstraintViolation { ref field, .. } if field == "key"
    ));
}

#[test]
fn test_keynonce_default_length() {
    let mut registry = TaskTypeRegistry::default();
    registry
        .register_record(TaskTypeRecord::new("plain_kn").with_extension("keynonce", Value::Null))
        .unwrap();
    let schema = registry.lookup("plain_kn").unwrap();

    assert_eq!(
        schema.field("key").unwrap().spec.pattern(),
        Some("^[0-9a-fA-F]{16}$")
    );
    assert_eq!(
        schema.field("nonce").unwrap().spec.pattern(),
        Some("^[0-9a-fA-F]{16}$")
    );
}

#[test]
fn test_window_roundtrip_through_codec() {
    let registry = foo_registry();
    let codec = WindowCodec::new(Arc::clone(&registry));
    let params = registry
        .lookup("foo")
        .unwrap()
        .validate(&foo_params("0123456789ab"))
        .unwrap();
    let window = Window::new(params)
        .with_id("6651f0c2")
        .with_state(WindowState::Complete);

    let document = codec.encode(&window);
    assert_eq!(document["params"]["task_type"], "foo");

    let decoded = codec.decode(&document).unwrap();
    assert_eq!(decoded, window);
}

#[test]
fn test_decode_unregistered_discriminator() {
    let codec = WindowCodec::new(foo_registry());
    let document: Document = serde_json::from_value(json!({
        "_id": "1",
        "params": {"task_type": "bar"},
        "state": "open",
    }))
    .unwrap();

    let err = codec.decode(&document).unwrap_err();
    assert_eq!(
        err,
        DecodeError::UnresolvedTaskType {
            task_type: "bar".to_string()
        }
    );
    assert!(!TaskingError::from(err).is_registration_error());
}

#[test]
fn test_same_extensions_different_names() {
    let mut registry = TaskTypeRegistry::default();
    registry.initialize(vec![
        TaskTypeRecord::new("one").with_extension("symbol_set", Value::Null),
        TaskTypeRecord::new("two").with_extension("symbol_set", Value::Null),
    ]);

    let one = registry.lookup("one").unwrap();
    let two = registry.lookup("two").unwrap();
    assert_eq!(one.title(), "ONE_WindowParams");
    assert_eq!(two.title(), "TWO_WindowParams");

    let raw = json!({
        "start_time": "2024-05-01T12:00:00Z",
        "stop_time": "2024-05-01T12:30:00Z",
        "datasources": ["radar"],
        "symbol_set": 1,
    });
    assert_eq!(one.validate(&raw).unwrap().task_type(), "one");
    assert_eq!(two.validate(&raw).unwrap().task_type(), "two");
}

#[derive(Debug)]
struct XField;

impl tasking_domain::Extension for XField {
    fn field_definitions(&self) -> FieldSet {
        let mut fields = FieldSet::new();
        fields.insert("x".to_string(), FieldSpec::new(FieldType::String));
        fields
    }
}

#[test]
fn test_colliding_extensions_rejected() {
    let mut catalog = ExtensionCatalog::builtin();
    catalog.register("first_x", |_| Ok(Box::new(XField))).unwrap();
    catalog.register("second_x", |_| Ok(Box::new(XField))).unwrap();

    let mut registry = TaskTypeRegistry::new(Arc::new(catalog));
    let report = registry.initialize(vec![TaskTypeRecord::new("clash")
        .with_extension("first_x", Value::Null)
        .with_extension("second_x", Value::Null)]);

    assert!(report.registered.is_empty());
    assert_eq!(
        report.rejected[0].error,
        TaskingError::FieldCollision {
            field: "x".to_string(),
            first_owner: "first_x".to_string(),
            second_owner: "second_x".to_string(),
        }
    );
    assert!(registry.is_empty());
}
