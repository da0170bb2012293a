use std::sync::Arc;

use serde_json::json;
use tasking_config::DatabaseConfig;
use tasking_domain::{
    DecodeError, DocumentStore, TaskType, TaskTypeRegistry, WindowCodec, WindowState,
};
use tasking_errors::TaskingError;
use tasking_infrastructure::{
    register_types_from_db, DatabaseManager, TaskTypeCollection, WindowCollection,
};
use tasking_testing_utils::{sample_records, sample_window, TaskTypeRecordBuilder};

async fn insert_raw(db: &DatabaseManager, id: &str, collection: &str, body: &str) {
    sqlx::query(
        "INSERT INTO documents (id, collection, body, created_at) VALUES (?, ?, ?, '2024-01-01T00:00:00Z')",
    )
    .bind(id)
    .bind(collection)
    .bind(body)
    .execute(db.pool())
    .await
    .unwrap();
}

async fn memory_database() -> DatabaseManager {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };
    DatabaseManager::new(&config).await.unwrap()
}

#[tokio::test]
async fn test_task_types_persist_and_register() {
    let db = memory_database().await;
    let store: Arc<dyn DocumentStore> = Arc::new(db.document_store());
    let task_types = TaskTypeCollection::new(Arc::clone(&store));

    for record in sample_records() {
        task_types
            .insert_one(TaskType::try_from(record).unwrap())
            .await
            .unwrap();
    }

    let mut registry = TaskTypeRegistry::default();
    let report = register_types_from_db(&task_types, &mut registry)
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.registered.len(), 2);
    let foo = registry.lookup("foo").unwrap();
    assert_eq!(
        foo.field("key").unwrap().spec.pattern(),
        Some("^[0-9a-fA-F]{12}$")
    );
}

#[tokio::test]
async fn test_windows_roundtrip_through_sqlite() {
    let db = memory_database().await;
    let store: Arc<dyn DocumentStore> = Arc::new(db.document_store());

    let mut registry = TaskTypeRegistry::default();
    registry.initialize(sample_records());
    let registry = Arc::new(registry);
    let windows = WindowCollection::new(Arc::clone(&store), WindowCodec::new(Arc::clone(&registry)));

    let foo = windows
        .insert_one(sample_window(&registry, "foo", WindowState::Open).unwrap())
        .await
        .unwrap();
    let bar = windows
        .insert_one(sample_window(&registry, "bar", WindowState::Complete).unwrap())
        .await
        .unwrap();

    let listing = windows.find_all().await.unwrap();
    assert!(listing.failures.is_empty());
    assert_eq!(listing.windows, vec![foo.clone(), bar]);

    let only_foo = windows.find_by(Some("foo"), None).await.unwrap();
    assert_eq!(only_foo.windows, vec![foo]);

    let complete = windows
        .find_by(None, Some(WindowState::Complete))
        .await
        .unwrap();
    assert_eq!(complete.windows.len(), 1);
    assert_eq!(complete.windows[0].task_type(), "bar");
}

#[tokio::test]
async fn test_windows_of_unregistered_type_reported_after_restart() {
    let db = memory_database().await;
    let store: Arc<dyn DocumentStore> = Arc::new(db.document_store());

    let mut before = TaskTypeRegistry::default();
    before.initialize(sample_records());
    let before = Arc::new(before);
    let windows = WindowCollection::new(Arc::clone(&store), WindowCodec::new(Arc::clone(&before)));
    let stale = windows
        .insert_one(sample_window(&before, "foo", WindowState::Open).unwrap())
        .await
        .unwrap();
    windows
        .insert_one(sample_window(&before, "bar", WindowState::Open).unwrap())
        .await
        .unwrap();

    let mut after = TaskTypeRegistry::default();
    after.initialize(vec![TaskTypeRecordBuilder::new().with_name("bar").build()]);
    let windows = WindowCollection::new(store, WindowCodec::new(Arc::new(after)));

    let listing = windows.find_all().await.unwrap();
    assert_eq!(listing.windows.len(), 1);
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].id, stale.id);
    assert_eq!(
        listing.failures[0].error,
        TaskingError::Decode(DecodeError::UnresolvedTaskType {
            task_type: "foo".to_string()
        })
    );
}

#[tokio::test]
async fn test_duplicate_task_type_rejected_by_store() {
    let db = memory_database().await;
    let task_types = TaskTypeCollection::new(Arc::new(db.document_store()));
    let record = TaskTypeRecordBuilder::new()
        .with_name("dup")
        .with_extension("symbol_set", json!({}))
        .build();

    task_types
        .insert_one(TaskType::try_from(record.clone()).unwrap())
        .await
        .unwrap();
    let err = task_types
        .insert_one(TaskType::try_from(record).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(err, TaskingError::TaskTypeAlreadyExists { .. }));
}

#[tokio::test]
async fn test_concurrent_task_type_submissions_conflict() {
    let db = memory_database().await;
    let task_types = TaskTypeCollection::new(Arc::new(db.document_store()));
    let record = TaskTypeRecordBuilder::new().with_name("race").build();

    let (first, second) = tokio::join!(
        task_types.insert_one(TaskType::try_from(record.clone()).unwrap()),
        task_types.insert_one(TaskType::try_from(record).unwrap()),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(TaskingError::TaskTypeAlreadyExists { name }) if name == "race"
    )));
}

#[tokio::test]
async fn test_task_type_name_unique_in_store() {
    let db = memory_database().await;
    let store = db.document_store();
    let document = |value: serde_json::Value| serde_json::from_value(value).unwrap();

    store
        .insert_one(TaskTypeCollection::COLLECTION, document(json!({"name": "dup"})))
        .await
        .unwrap();
    let err = store
        .insert_one(TaskTypeCollection::COLLECTION, document(json!({"name": "dup"})))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskingError::DatabaseOperation(_)));

    // 其他集合不受约束
    store
        .insert_one(WindowCollection::COLLECTION, document(json!({"name": "dup"})))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_corrupt_window_row_reports_its_id() {
    let db = memory_database().await;
    let store: Arc<dyn DocumentStore> = Arc::new(db.document_store());

    let mut registry = TaskTypeRegistry::default();
    registry.initialize(sample_records());
    let registry = Arc::new(registry);
    let windows = WindowCollection::new(Arc::clone(&store), WindowCodec::new(Arc::clone(&registry)));
    windows
        .insert_one(sample_window(&registry, "foo", WindowState::Open).unwrap())
        .await
        .unwrap();
    insert_raw(&db, "corrupt", WindowCollection::COLLECTION, "[1,2]").await;

    let listing = windows.find_all().await.unwrap();
    assert_eq!(listing.windows.len(), 1);
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].id.as_deref(), Some("corrupt"));
    assert!(matches!(
        listing.failures[0].error,
        TaskingError::CorruptDocument { ref id, .. } if id == "corrupt"
    ));
}

#[tokio::test]
async fn test_corrupt_task_type_row_rejected_by_id() {
    let db = memory_database().await;
    let task_types = TaskTypeCollection::new(Arc::new(db.document_store()));
    task_types
        .insert_one(TaskType::try_from(TaskTypeRecordBuilder::new().with_name("ok").build()).unwrap())
        .await
        .unwrap();
    insert_raw(&db, "corrupt", TaskTypeCollection::COLLECTION, "\"text\"").await;

    let mut registry = TaskTypeRegistry::default();
    let report = register_types_from_db(&task_types, &mut registry)
        .await
        .unwrap();

    assert_eq!(report.registered, vec!["ok"]);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].name, "corrupt");
}
