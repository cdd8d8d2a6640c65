mod common;

use common::*;
use metasync_connector::{
    AuditExport, ConnectorError, CycleState, DeliveryOutcome, ReconciliationEngine,
};
use metasync_types::{Entity, Event, EventType};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

async fn open(sink: &RecordingSink, store: &MemoryStateStore) -> ReconciliationEngine {
    ReconciliationEngine::open(CONNECTOR_ID, Box::new(sink.clone()), Box::new(store.clone())).await
}

// ── Opening ──────────────────────────────────────────────────────

#[tokio::test]
async fn open_seeds_pending_delete_from_prior_state() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1"), entity_key("t-2")]));
    let engine = open(&sink, &store).await;

    assert_eq!(engine.cycle_state(), CycleState::Open);
    assert_eq!(engine.pending_delete().len(), 2);
    assert!(engine.observed().is_empty());
    assert_eq!(engine.connector_id(), CONNECTOR_ID);
}

#[tokio::test]
async fn open_treats_load_failure_as_empty_state() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore {
        prior: Some(keys([entity_key("t-1")])),
        fail_load: true,
        ..Default::default()
    };
    let engine = open(&sink, &store).await;
    assert!(engine.pending_delete().is_empty());
}

// ── Scenarios ────────────────────────────────────────────────────

#[tokio::test]
async fn first_run_without_prior_state() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::default();
    let mut engine = open(&sink, &store).await;
    assert!(engine.pending_delete().is_empty());

    engine.observe(upsert_entity("t-1")).await.unwrap();
    let report = engine.finalize_cycle().await.unwrap();

    assert!(sink.deletes().is_empty());
    assert_eq!(store.saved(), Some(keys([entity_key("t-1")])));
    assert_eq!(report.tombstones, 0);
    assert_eq!(report.observed, 1);
    assert!(report.state_saved);
}

#[tokio::test]
async fn second_run_tombstones_absent_record() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1")]));
    let engine = open(&sink, &store).await;

    let report = engine.finalize_cycle().await.unwrap();

    let deletes = sink.deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].key(), entity_key("t-1"));
    assert_eq!(deletes[0].event_type, EventType::Delete);
    assert_eq!(deletes[0].connector_id, CONNECTOR_ID);
    assert_eq!(store.saved(), Some(keys([])));
    assert_eq!(report.tombstones, 1);
}

#[tokio::test]
async fn reasserted_record_is_not_tombstoned() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1"), entity_key("t-2")]));
    let mut engine = open(&sink, &store).await;

    engine.observe(upsert_entity("t-1")).await.unwrap();
    engine.finalize_cycle().await.unwrap();

    let deletes = sink.deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].key(), entity_key("t-2"));
    assert_eq!(store.saved(), Some(keys([entity_key("t-1")])));
}

#[tokio::test]
async fn relationship_tombstone_carries_only_identity() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([relationship_key("t-1", "c-1")]));
    let engine = open(&sink, &store).await;
    engine.finalize_cycle().await.unwrap();

    let deletes = sink.deletes();
    assert_eq!(deletes.len(), 1);
    match &deletes[0].payload {
        metasync_types::Payload::Relationship(r) => {
            assert_eq!(r.from_id, "t-1");
            assert_eq!(r.to_id, "c-1");
            assert_eq!(r.schema_ref, schema("contains"));
            assert!(r.attributes.is_empty());
        }
        other => panic!("expected relationship tombstone, got {other:?}"),
    }
}

// ── observe ──────────────────────────────────────────────────────

#[tokio::test]
async fn observe_drains_pending_and_tracks_observed() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1"), relationship_key("a", "b")]));
    let mut engine = open(&sink, &store).await;

    engine.observe(upsert_relationship("a", "b")).await.unwrap();
    engine.observe(upsert_entity("t-9")).await.unwrap();

    assert_eq!(engine.pending_delete(), &keys([entity_key("t-1")]));
    assert_eq!(
        engine.observed(),
        &keys([relationship_key("a", "b"), entity_key("t-9")])
    );
    assert_eq!(sink.published().len(), 2);
}

#[tokio::test]
async fn duplicate_observation_is_tracked_once() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::default();
    let mut engine = open(&sink, &store).await;

    engine.observe(upsert_entity("t-1")).await.unwrap();
    engine.observe(upsert_entity("t-1")).await.unwrap();

    assert_eq!(engine.observed().len(), 1);
    assert_eq!(sink.published().len(), 2);
}

#[tokio::test]
async fn observe_returns_sink_outcome() {
    let sink = RecordingSink::new().with_outcome(DeliveryOutcome::Unconfirmed { status: 201 });
    let store = MemoryStateStore::default();
    let mut engine = open(&sink, &store).await;

    let outcome = engine.observe(upsert_entity("t-1")).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Unconfirmed { status: 201 });

    let report = engine.finalize_cycle().await.unwrap();
    assert_eq!(report.unconfirmed, 1);
}

#[tokio::test]
async fn failed_delivery_still_drains_and_continues() {
    let sink = RecordingSink::new().with_outcome(DeliveryOutcome::Failed {
        reason: "HTTP 500".to_string(),
    });
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1")]));
    let mut engine = open(&sink, &store).await;

    let outcome = engine.observe(upsert_entity("t-1")).await.unwrap();
    assert!(outcome.is_failed());
    assert!(engine.pending_delete().is_empty());

    let report = engine.finalize_cycle().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.tombstones, 0);
    assert_eq!(store.saved(), Some(keys([entity_key("t-1")])));
}

#[tokio::test]
async fn explicit_delete_is_published_and_not_tombstoned_again() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1")]));
    let mut engine = open(&sink, &store).await;

    let delete = Event::delete(CONNECTOR_ID, Entity::new(schema("table"), "t-1"));
    engine.observe(delete).await.unwrap();
    assert!(engine.pending_delete().is_empty());
    assert!(engine.observed().is_empty());

    let report = engine.finalize_cycle().await.unwrap();
    assert_eq!(sink.deletes().len(), 1);
    assert_eq!(report.tombstones, 0);
    assert_eq!(store.saved(), Some(keys([])));
}

// ── Fatal errors ─────────────────────────────────────────────────

#[tokio::test]
async fn fatal_error_aborts_cycle_without_saving() {
    let sink = RecordingSink::new().fatal_on(entity_key("bad"));
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1")]));
    let mut engine = open(&sink, &store).await;

    let err = engine.observe(upsert_entity("bad")).await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(engine.cycle_state(), CycleState::Aborted);

    let next = engine.observe(upsert_entity("t-2")).await.unwrap_err();
    assert!(matches!(next, ConnectorError::CycleAborted));

    let finalize = engine.finalize_cycle().await.unwrap_err();
    assert!(matches!(finalize, ConnectorError::CycleAborted));
    assert!(sink.deletes().is_empty());
    assert_eq!(store.saved(), None);
}

#[tokio::test]
async fn fatal_error_during_tombstones_skips_save() {
    let sink = RecordingSink::new().fatal_on(entity_key("t-2"));
    let store = MemoryStateStore::with_prior(keys([entity_key("t-1"), entity_key("t-2")]));
    let engine = open(&sink, &store).await;

    let err = engine.finalize_cycle().await.unwrap_err();
    assert!(matches!(err, ConnectorError::Provisioning { .. }));
    assert_eq!(store.saved(), None);
}

// ── Save and export ──────────────────────────────────────────────

#[tokio::test]
async fn save_failure_is_reported_but_tombstones_are_published() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore {
        prior: Some(keys([entity_key("t-1")])),
        fail_save: true,
        ..Default::default()
    };
    let engine = open(&sink, &store).await;

    let report = engine.finalize_cycle().await.unwrap();
    assert!(!report.state_saved);
    assert_eq!(report.tombstones, 1);
    assert_eq!(sink.deletes().len(), 1);
}

#[tokio::test]
async fn export_contains_every_published_event() {
    let dir = TempDir::new().unwrap();
    let sink = RecordingSink::new();
    let store = MemoryStateStore::with_prior(keys([entity_key("gone")]));
    let mut engine = open(&sink, &store)
        .await
        .with_export(AuditExport::new(dir.path()));

    engine.observe(upsert_entity("t-1")).await.unwrap();
    engine.observe(upsert_relationship("t-1", "c-1")).await.unwrap();
    let report = engine.finalize_cycle().await.unwrap();
    assert!(report.export_written);

    let raw = std::fs::read_to_string(dir.path().join("connector_export.json")).unwrap();
    let exported: Vec<Event> = serde_json::from_str(&raw).unwrap();
    assert_eq!(exported.len(), 3);
    assert_eq!(exported[0], upsert_entity("t-1"));
    assert_eq!(exported[2].key(), entity_key("gone"));
    assert_eq!(exported[2].event_type, EventType::Delete);
}

#[tokio::test]
async fn next_cycle_reloads_what_finalize_saved() {
    let sink = RecordingSink::new();
    let store = MemoryStateStore::default();

    let mut first = open(&sink, &store).await;
    first.observe(upsert_entity("t-1")).await.unwrap();
    first.observe(upsert_entity("t-2")).await.unwrap();
    first.finalize_cycle().await.unwrap();

    let second_store = MemoryStateStore::with_prior(store.saved().unwrap());
    let mut second = open(&sink, &second_store).await;
    second.observe(upsert_entity("t-2")).await.unwrap();
    second.finalize_cycle().await.unwrap();

    let deletes = sink.deletes();
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].key(), entity_key("t-1"));
    assert_eq!(second_store.saved(), Some(keys([entity_key("t-2")])));
}
