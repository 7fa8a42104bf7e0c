//! Edge case tests for sift-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use serde_json::json;
use sift_engine::{
    changes, ConsistencyPolicy, Error, KeyKind, KeyValue, LocalRecord, MemoryStore, Operation,
    OperationSet, ReconcileConfig, ReconcileError, ReconcileReport, Reconciler, RemoteRecord,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sift_engine=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn create_test_store(ids: &[serde_json::Value]) -> MemoryStore {
    let mut store = MemoryStore::new().with_entity("items");
    for id in ids {
        store.insert("items", json!({"id": id, "name": "local"})).unwrap();
    }
    store
}

fn remote(values: serde_json::Value) -> Vec<RemoteRecord> {
    serde_json::from_value(values).unwrap()
}

fn insert(record: &RemoteRecord, store: &mut MemoryStore) -> Result<(), Error> {
    store.insert_remote("items", record).map(|_| ())
}

fn update(record: &RemoteRecord, local: &mut LocalRecord) -> Result<(), Error> {
    local.assign(record);
    Ok(())
}

fn sync(store: &mut MemoryStore, records: &[RemoteRecord]) -> ReconcileReport {
    changes(store, records, "items", "id", "id", insert, update).unwrap()
}

// ============================================================================
// Key Edge Cases
// ============================================================================

#[test]
fn unicode_string_keys() {
    init_tracing();
    let keys = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Hello\nWorld\tTab",
        "Null\0Test",
        "",
    ];
    let mut store = create_test_store(&[json!(keys[0]), json!("stale")]);

    let records: Vec<_> = keys
        .iter()
        .map(|k| RemoteRecord::new().with("id", *k))
        .collect();
    let report = sync(&mut store, &records);

    assert_eq!(report.deleted, vec![KeyValue::from("stale")]);
    assert_eq!(report.updated, vec![KeyValue::from(keys[0])]);
    assert_eq!(report.inserted.len(), keys.len() - 1);
    for key in &keys {
        assert!(store.find("items", "id", &KeyValue::from(*key)).is_some(), "missing {key:?}");
    }
}

#[test]
fn integer_boundaries() {
    let values = [i64::MIN, -1, 0, 1, i64::MAX];
    let mut store = create_test_store(&values.iter().map(|v| json!(v)).collect::<Vec<_>>());

    let records: Vec<_> = values
        .iter()
        .map(|v| RemoteRecord::new().with("id", *v))
        .chain(std::iter::once(RemoteRecord::new().with("id", u64::MAX)))
        .collect();
    let report = sync(&mut store, &records);

    assert!(report.deleted.is_empty());
    assert_eq!(report.inserted, vec![KeyValue::UInt(u64::MAX)]);
    assert_eq!(report.updated.len(), values.len());
}

#[test]
fn string_and_integer_keys_do_not_match() {
    let mut store = create_test_store(&[json!(1)]);
    let records = remote(json!([{"id": "1"}]));

    let report = sync(&mut store, &records);

    assert_eq!(report.deleted, vec![KeyValue::Int(1)]);
    assert_eq!(report.inserted, vec![KeyValue::from("1")]);
    assert!(report.updated.is_empty());
}

#[test]
fn unsigned_and_signed_representations_match() {
    let mut store = create_test_store(&[json!(7u64)]);
    let records = remote(json!([{"id": 7i64, "name": "remote"}]));

    let report = sync(&mut store, &records);

    assert_eq!(report.updated, vec![KeyValue::Int(7)]);
    assert!(report.is_unchanged());
}

#[test]
fn unusable_remote_keys_are_ignored() {
    let mut store = create_test_store(&[json!(1)]);
    let records = remote(json!([
        {"id": 1, "name": "kept"},
        {"id": null},
        {"name": "no id"},
        {"id": 1.5},
        {"id": true},
        {"id": [1]},
        {"id": {"nested": 1}}
    ]));

    let report = sync(&mut store, &records);

    assert_eq!(report.updated, vec![KeyValue::Int(1)]);
    assert!(report.inserted.is_empty());
    assert!(report.deleted.is_empty());
    assert_eq!(report.skipped_remote, 6);
    assert_eq!(store.len("items"), 1);
}

#[test]
fn key_kind_filter_excludes_other_kinds() {
    let mut store = create_test_store(&[]);
    let records = remote(json!([{"id": 1}, {"id": "two"}]));

    let report = Reconciler::new(ReconcileConfig::new().key_kind(KeyKind::String))
        .reconcile(&mut store, &records, "items", "id", "id", None, insert, update)
        .unwrap();

    assert_eq!(report.inserted, vec![KeyValue::from("two")]);
    assert_eq!(report.skipped_remote, 1);
}

#[test]
fn duplicate_remote_keys_last_wins() {
    let mut store = create_test_store(&[json!(5)]);
    let records = remote(json!([{"id": 5, "v": "a"}, {"id": 5, "v": "b"}]));

    let report = sync(&mut store, &records);

    assert_eq!(report.updated, vec![KeyValue::Int(5)]);
    assert_eq!(report.duplicate_remote, 1);
    let local = store.find("items", "id", &KeyValue::Int(5)).unwrap();
    assert_eq!(local.get("v"), Some(&json!("b")));
}

#[test]
fn duplicate_local_keys_are_uniqued() {
    let mut store = create_test_store(&[json!(1), json!(1), json!(1), json!(2)]);
    let records = remote(json!([{"id": 1}, {"id": 2}]));

    let report = sync(&mut store, &records);

    assert!(report.deleted.is_empty());
    assert_eq!(report.updated.len(), 2);
    assert_eq!(store.len("items"), 2);
}

// ============================================================================
// Collection Edge Cases
// ============================================================================

#[test]
fn both_sides_empty() {
    let mut store = create_test_store(&[]);
    let report = sync(&mut store, &[]);
    assert_eq!(report, ReconcileReport::default());
}

#[test]
fn empty_operation_set_still_uniques() {
    let mut store = create_test_store(&[json!(1), json!(1)]);
    store.insert("items", json!({"name": "no key"})).unwrap();
    let records = remote(json!([{"id": 2}]));

    let report = Reconciler::new(ReconcileConfig::new().operations(OperationSet::empty()))
        .reconcile(&mut store, &records, "items", "id", "id", None, insert, update)
        .unwrap();

    assert!(report.deleted.is_empty());
    assert!(report.inserted.is_empty());
    assert!(report.updated.is_empty());
    assert_eq!(store.keys("items", "id"), vec![KeyValue::Int(1)]);
    assert_eq!(store.len("items"), 1);
}

#[test]
fn delete_only() {
    let mut store = create_test_store(&[json!(1), json!(2), json!(3)]);
    let records = remote(json!([{"id": 2}, {"id": 3}, {"id": 4}]));

    let report = Reconciler::new(ReconcileConfig::new().operations(Operation::Delete))
        .reconcile(
            &mut store,
            &records,
            "items",
            "id",
            "id",
            None,
            |_, _| -> Result<(), Error> { panic!("insert handler must not run") },
            |_, _| panic!("update handler must not run"),
        )
        .unwrap();

    assert_eq!(report.deleted, vec![KeyValue::Int(1)]);
    assert_eq!(
        store.keys("items", "id"),
        vec![KeyValue::Int(2), KeyValue::Int(3)]
    );
}

#[test]
fn entities_are_isolated() {
    let mut store = create_test_store(&[json!(1)]);
    store.add_entity("orders");
    store.insert("orders", json!({"id": 1})).unwrap();
    store.insert("orders", json!({"id": 2})).unwrap();

    let report = sync(&mut store, &[]);

    assert_eq!(report.deleted, vec![KeyValue::Int(1)]);
    assert_eq!(store.len("items"), 0);
    assert_eq!(store.len("orders"), 2);
}

#[test]
fn many_records() {
    let local: Vec<_> = (0..1000).map(|i| json!(i)).collect();
    let mut store = create_test_store(&local);
    let records: Vec<_> = (500..1500)
        .map(|i| RemoteRecord::new().with("id", i).with("name", format!("item {i}")))
        .collect();

    let report = sync(&mut store, &records);

    assert_eq!(report.deleted.len(), 500);
    assert_eq!(report.inserted.len(), 500);
    assert_eq!(report.updated.len(), 500);
    assert_eq!(store.len("items"), 1000);
    // Deletions run in ascending key order, inserts and updates in remote order
    assert_eq!(report.deleted.first(), Some(&KeyValue::Int(0)));
    assert_eq!(report.inserted.first(), Some(&KeyValue::Int(1000)));
    assert_eq!(report.updated.last(), Some(&KeyValue::Int(999)));
}

// ============================================================================
// Handler Edge Cases
// ============================================================================

#[derive(Debug, PartialEq)]
struct Rejected(KeyValue);

#[test]
fn handler_errors_are_returned_verbatim() {
    let mut store = create_test_store(&[json!(1), json!(2), json!(3)]);
    let records = remote(json!([{"id": 1}, {"id": 2}, {"id": 3}]));
    let mut seen = Vec::new();

    let err = changes(
        &mut store,
        &records,
        "items",
        "id",
        "id",
        |_, _| Ok(()),
        |record, _| {
            let key = record.key("id", None).unwrap();
            seen.push(key.clone());
            if key == KeyValue::Int(2) {
                Err(Rejected(key))
            } else {
                Ok(())
            }
        },
    )
    .unwrap_err();

    assert_eq!(seen, vec![KeyValue::Int(1), KeyValue::Int(2)]);
    match err {
        ReconcileError::Handler {
            operation, error, ..
        } => {
            assert_eq!(operation, Operation::Update);
            assert_eq!(error, Rejected(KeyValue::Int(2)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn retry_after_failure_converges() {
    let mut store = create_test_store(&[json!(1), json!(2)]);
    let records = remote(json!([{"id": 2}, {"id": 3}, {"id": 4}]));
    let mut budget = 1;

    let err = changes(
        &mut store,
        &records,
        "items",
        "id",
        "id",
        |record, store| {
            if budget == 0 {
                return Err(Error::InvalidOperation("out of budget".into()));
            }
            budget -= 1;
            insert(record, store)
        },
        update,
    )
    .unwrap_err();
    assert!(matches!(err, ReconcileError::Handler { .. }));
    assert_eq!(
        store.keys("items", "id"),
        vec![KeyValue::Int(2), KeyValue::Int(3)]
    );

    let report = sync(&mut store, &records);
    assert!(report.deleted.is_empty());
    assert_eq!(report.inserted, vec![KeyValue::Int(4)]);
    assert_eq!(
        store.keys("items", "id"),
        vec![KeyValue::Int(2), KeyValue::Int(3), KeyValue::Int(4)]
    );
}

#[test]
fn update_handler_can_reject_mistyped_fields() {
    let mut store = create_test_store(&[json!(1)]);
    let records = remote(json!([{"id": 1, "count": "three"}]));

    let err = changes(
        &mut store,
        &records,
        "items",
        "id",
        "id",
        insert,
        |record, local| {
            let count = record.get_i64("count")?.unwrap_or(0);
            local.set("count", count);
            Ok(())
        },
    )
    .unwrap_err();

    assert!(matches!(
        err.into_handler_error(),
        Some(Error::FieldType { ref field, .. }) if field == "count"
    ));
}

#[test]
fn strict_policy_passes_when_consistent() {
    let mut store = create_test_store(&[json!(1), json!(2)]);
    let records = remote(json!([{"id": 2}, {"id": 3}]));
    let config = ReconcileConfig::new().on_inconsistency(ConsistencyPolicy::Fail);

    let report = Reconciler::new(config)
        .reconcile(&mut store, &records, "items", "id", "id", None, insert, update)
        .unwrap();

    assert!(report.warnings.is_empty());
    assert_eq!(report.deleted, vec![KeyValue::Int(1)]);
    assert_eq!(report.inserted, vec![KeyValue::Int(3)]);
}
