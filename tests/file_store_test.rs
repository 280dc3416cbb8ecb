//! Durable store integration: assignments survive an engine restart

use std::sync::Arc;

use variant_db::events::MemorySink;
use variant_db::experiment::{Experiment, Variant};
use variant_db::kv::{KvStore, SqliteKvStore};
use variant_db::store::{AssignmentStore, KvAssignmentStore, DEFAULT_NAMESPACE};
use variant_db::{Engine, RequestContext};

fn experiment(weight_a: f64, weight_b: f64) -> Experiment {
    Experiment::builder("enroll_discount")
        .variant(Variant::new("a", weight_a))
        .variant(Variant::new("b", weight_b))
        .build()
}

fn open_engine(dir: &std::path::Path, exp: Experiment) -> (Engine<KvAssignmentStore<SqliteKvStore>>, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let store = KvAssignmentStore::new(SqliteKvStore::open(dir.join("assignments.db")).unwrap());
    let engine = Engine::builder(store)
        .sink(Arc::clone(&sink))
        .default_experiments([exp])
        .build()
        .unwrap();
    (engine, sink)
}

#[test]
fn test_assignments_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = RequestContext::new("visitor-1");

    let assigned = {
        let (engine, sink) = open_engine(dir.path(), experiment(50.0, 50.0));
        let result = engine.get_variant("enroll_discount", &ctx);
        assert_eq!(sink.len(), 1);
        result
    };

    // Restart with a configuration that would pick the other variant
    let (flipped_a, flipped_b) = if assigned.variant_id == "a" { (0.0, 1.0) } else { (1.0, 0.0) };
    let (engine, sink) = open_engine(dir.path(), experiment(flipped_a, flipped_b));

    assert_eq!(engine.get_variant("enroll_discount", &ctx), assigned);
    assert!(sink.is_empty(), "sticky hit must not emit assignment_created");
}

#[test]
fn test_persisted_layout_is_namespaced_json_list() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = open_engine(dir.path(), experiment(1.0, 1.0));
    engine.get_variant("enroll_discount", &RequestContext::new("visitor-2"));

    let raw = engine
        .store()
        .kv()
        .get(&format!("{DEFAULT_NAMESPACE}:visitor-2"))
        .unwrap()
        .unwrap();
    let records: serde_json::Value = serde_json::from_slice(&raw).unwrap();

    assert_eq!(records.as_array().map(Vec::len), Some(1));
    assert_eq!(records[0]["experimentId"], "enroll_discount");
    assert_eq!(records[0]["subjectSessionId"], "visitor-2");
}

#[test]
fn test_corrupt_record_degrades_and_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, sink) = open_engine(dir.path(), experiment(1.0, 1.0));
    engine
        .store()
        .kv()
        .set(&format!("{DEFAULT_NAMESPACE}:visitor-3"), b"not json".to_vec())
        .unwrap();

    let ctx = RequestContext::new("visitor-3");
    let result = engine.get_variant("enroll_discount", &ctx);
    assert!(result.is_in_test);
    assert_eq!(sink.len(), 1);

    // Re-persisted over the corrupt record
    let stored = engine.store().get("visitor-3", "enroll_discount").unwrap().unwrap();
    assert_eq!(stored.variant_id(), result.variant_id);
}

#[test]
fn test_long_subject_ids_persist_and_stay_sticky() {
    let dir = tempfile::tempdir().unwrap();
    // Opaque session tokens (JWTs and the like) run to hundreds of bytes
    let subject = format!("eyJhbGciOiJIUzI1NiJ9.{}", "t".repeat(240));
    let ctx = RequestContext::new(subject.clone());

    let assigned = {
        let (engine, sink) = open_engine(dir.path(), experiment(1.0, 1.0));
        let result = engine.get_variant("enroll_discount", &ctx);
        assert!(result.is_in_test);
        assert_eq!(sink.len(), 1);

        let stored = engine.list_assignments_for_subject(&subject).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].variant_id(), result.variant_id);

        // Sticky within the same process
        assert_eq!(engine.get_variant("enroll_discount", &ctx), result);
        assert_eq!(sink.len(), 1);
        result
    };

    let (engine, sink) = open_engine(dir.path(), experiment(1.0, 1.0));
    assert_eq!(engine.get_variant("enroll_discount", &ctx), assigned);
    assert!(sink.is_empty());
}
