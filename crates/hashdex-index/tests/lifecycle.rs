//! Index lifecycle tests against the in-memory store.

mod common;

use hashdex_index::{
    DocumentSchema, FieldKind, IndexState, Reconciled, SchemaRegistry, StoreOp,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Single-type reconciliation
// ============================================================================

#[tokio::test]
async fn test_unchanged_schema_creates_exactly_once() {
    let (store, manager) = common::manager();
    let schema = common::people_schema();

    assert_eq!(
        manager.ensure_index(&schema).await.unwrap(),
        Reconciled::Rebuilt { dropped: false }
    );
    assert_eq!(
        manager.ensure_index(&schema).await.unwrap(),
        Reconciled::Unchanged
    );

    assert_eq!(store.count(StoreOp::CreateIndex), 1);
    // The only drop is the tolerated drop-if-exists of the first build
    assert_eq!(store.count(StoreOp::DropIndex), 1);
}

#[tokio::test]
async fn test_schema_change_drops_then_creates_once() {
    let (store, manager) = common::manager();
    manager
        .ensure_index(&common::people_schema())
        .await
        .unwrap();
    let before = manager.record("people").await.unwrap().fingerprint;
    store.clear_calls();

    let outcome = manager
        .ensure_index(&common::people_schema_extended())
        .await
        .unwrap();

    assert_eq!(outcome, Reconciled::Rebuilt { dropped: true });
    let writes: Vec<StoreOp> = store
        .calls()
        .into_iter()
        .filter(|op| matches!(op, StoreOp::DropIndex | StoreOp::CreateIndex))
        .collect();
    assert_eq!(writes, vec![StoreOp::DropIndex, StoreOp::CreateIndex]);

    let after = manager.record("people").await.unwrap().fingerprint;
    assert!(after.is_some());
    assert_ne!(before, after);
    assert_eq!(store.index("people").unwrap().fields.len(), 4);
}

#[tokio::test]
async fn test_retyped_field_triggers_rebuild() {
    let (store, manager) = common::manager();
    manager
        .ensure_index(&common::people_schema())
        .await
        .unwrap();

    let retyped = DocumentSchema::builder("people")
        .field::<i32>("age")
        .field_as::<String>("status", FieldKind::Text)
        .field::<String>("bio")
        .build();

    assert_eq!(
        manager.ensure_index(&retyped).await.unwrap(),
        Reconciled::Rebuilt { dropped: true }
    );
    assert_eq!(store.count(StoreOp::CreateIndex), 2);
}

#[tokio::test]
async fn test_missing_backend_index_is_tolerated_on_drop() {
    let (store, manager) = common::manager();
    // A record without a live index, e.g. after the index was removed by hand
    store.insert_hash("index:people", &[("fingerprint", "stale")]);

    let outcome = manager
        .ensure_index(&common::people_schema())
        .await
        .unwrap();

    assert_eq!(outcome, Reconciled::Rebuilt { dropped: false });
    assert!(store.has_index("people"));
}

#[tokio::test]
async fn test_drop_failure_propagates() {
    let (store, manager) = common::manager();
    store.fail_on(StoreOp::DropIndex);

    assert!(manager
        .ensure_index(&common::people_schema())
        .await
        .is_err());
    assert_eq!(store.count(StoreOp::CreateIndex), 0);
    assert_eq!(manager.state("people"), IndexState::Stale);
}

#[tokio::test]
async fn test_record_keeps_query_counter_across_rebuilds() {
    let (store, manager) = common::manager();
    store.insert_hash("index:people", &[("totalQueries", "7")]);

    manager
        .ensure_index(&common::people_schema())
        .await
        .unwrap();

    let record = manager.record("people").await.unwrap();
    assert_eq!(record.total_queries, 7);
    assert!(record.last_updated.is_some());
}

// ============================================================================
// Batch reconciliation
// ============================================================================

#[tokio::test]
async fn test_ensure_all_isolates_failures() {
    let (store, manager) = common::manager();
    let registry: SchemaRegistry = vec![
        common::people_schema(),
        DocumentSchema::builder("cars").field::<u32>("year").build(),
        DocumentSchema::builder("settings").build(),
    ]
    .into_iter()
    .collect();
    store.fail_index("cars");

    let report = manager.ensure_all(&registry).await;

    // "settings" has no fields and is not attempted
    assert_eq!(report.outcomes.len(), 2);
    let failed: Vec<&str> = report.failed().map(|(name, _)| name).collect();
    assert_eq!(failed, vec!["cars"]);
    assert!(store.has_index("people"));
    assert_eq!(manager.state("people"), IndexState::Fresh);
    assert_eq!(manager.state("cars"), IndexState::Stale);
    assert_eq!(manager.state("settings"), IndexState::Unknown);

    store.recover_index("cars");
    let report = manager.ensure_all(&registry).await;
    assert!(report.is_success());
    assert_eq!(report.rebuilt(), 1);
    assert_eq!(manager.state("cars"), IndexState::Fresh);
}

#[tokio::test]
async fn test_ensure_all_is_convergent() {
    let (store, manager) = common::manager();
    let registry: SchemaRegistry = vec![common::people_schema()].into_iter().collect();

    manager.ensure_all(&registry).await;
    let report = manager.ensure_all(&registry).await;

    assert_eq!(
        report.succeeded().collect::<Vec<_>>(),
        vec![("people", Reconciled::Unchanged)]
    );
    assert_eq!(store.count(StoreOp::CreateIndex), 1);
}

#[tokio::test]
async fn test_concurrent_reconciliations_converge() {
    let (store, manager) = common::manager();
    let schema = common::people_schema();

    let (a, b) = tokio::join!(manager.ensure_index(&schema), manager.ensure_index(&schema));

    // Both may rebuild; neither corrupts the result
    assert!(a.is_ok() || b.is_ok());
    assert!(store.has_index("people"));
    assert_eq!(
        manager.ensure_index(&schema).await.unwrap(),
        Reconciled::Unchanged
    );
}
