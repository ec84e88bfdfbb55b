use std::sync::Arc;

use concept_graph_core::config::{IndexConfig, StorageConfig};
use concept_graph_core::types::{AssociationType, ConceptId, ValidationError};
use tempfile::TempDir;

use super::*;

fn open_store(dir: &TempDir) -> GraphStore {
    GraphStore::open(dir.path(), StorageConfig::default(), IndexConfig::with_dimension(3))
        .expect("open failed")
}

#[test]
fn test_learn_then_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let receipt = store
        .learn_concept("the moon orbits the earth", Some(&[0.1, 0.2, 0.3][..]), 3.5, 0.8)
        .unwrap();
    assert!(receipt.created);
    assert_eq!(receipt.sequence, 1);

    let concept = store.get_concept(&receipt.id).expect("concept missing");
    assert_eq!(concept.content, "the moon orbits the earth");
    assert_eq!(concept.strength, 3.5);
    assert_eq!(concept.confidence, 0.8);
    assert_eq!(concept.access_count, 0);
    assert_eq!(concept.embedding, Some(vec![0.1, 0.2, 0.3]));
}

#[test]
fn test_relearn_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let first = store.learn_concept("iron rusts", None, 2.0, 0.5).unwrap();
    let second = store
        .learn_concept("iron rusts", Some(&[1.0, 0.0, 0.0][..]), 1.0, 0.9)
        .unwrap();
    assert_eq!(first.id, second.id);
    assert!(!second.created);

    let stats = store.stats();
    assert_eq!(stats.concepts, 1, "re-learn must not double count");
    assert_eq!(stats.written, 2);

    let concept = store.get_concept(&first.id).unwrap();
    assert_eq!(concept.strength, 2.0, "strength keeps the maximum");
    assert_eq!(concept.confidence, 0.5);
    assert_eq!(concept.embedding, Some(vec![1.0, 0.0, 0.0]), "embedding attached when absent");
    assert_eq!(store.search_similar(&[1.0, 0.0, 0.0], 1, None).unwrap()[0].0, first.id);
}

#[test]
fn test_validation_failures_are_dropped_not_logged() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    assert!(matches!(
        store.learn_concept("   ", None, 1.0, 0.5),
        Err(StorageError::Validation(ValidationError::EmptyContent))
    ));
    assert!(store.learn_concept("ok", None, 1.0, 1.5).is_err());
    assert!(store.learn_concept("ok", None, -1.0, 0.5).is_err());
    assert!(store.learn_concept("ok", Some(&[1.0][..]), 1.0, 0.5).is_err());

    let a = store.learn_concept("a real concept", None, 1.0, 1.0).unwrap();
    let missing = ConceptId::from_content("never learned");
    let err = store
        .learn_association(a.id, missing, AssociationType::Causal, 0.5)
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::MissingEndpoint { ref role, .. }) if role == "target"
    ));

    let stats = store.stats();
    assert_eq!(stats.dropped, 5);
    assert_eq!(stats.written, 1);
    assert_eq!(stats.pending, 1);
    assert_eq!(store.wal.lock().entry_count(), 1, "rejected writes never reach the log");
}

#[test]
fn test_mismatched_supplied_id_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let err = store
        .learn_concept_with_id(
            Some(ConceptId::from_content("other content")),
            "tidal locking",
            None,
            1.0,
            0.5,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::IdMismatch { .. })
    ));

    let id = ConceptId::from_content("tidal locking");
    let receipt = store
        .learn_concept_with_id(Some(id), "tidal locking", None, 1.0, 0.5)
        .unwrap();
    assert_eq!(receipt.id, id);

    let stats = store.stats();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.written, 1);
}

#[test]
fn test_reject_counts_externally_validated_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let err = store.reject("learn_text", ValidationError::EmptyContent);
    assert!(err.is_validation());
    assert_eq!(store.stats().dropped, 1);
    assert_eq!(store.stats().written, 0);
}

#[test]
fn test_duplicate_association_keeps_max_confidence() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let a = store.learn_concept("cause", None, 1.0, 1.0).unwrap().id;
    let b = store.learn_concept("effect", None, 1.0, 1.0).unwrap().id;

    store.learn_association(a, b, AssociationType::Causal, 0.4).unwrap();
    store.learn_association(a, b, AssociationType::Causal, 0.9).unwrap();
    store.learn_association(a, b, AssociationType::Causal, 0.6).unwrap();
    store.learn_association(a, b, AssociationType::Temporal, 0.2).unwrap();

    let edges = store.outgoing_associations(&a);
    assert_eq!(edges.len(), 2, "one edge per (source, target, type)");
    assert_eq!(edges[0].confidence, 0.9);
    assert_eq!(edges[1].assoc_type, AssociationType::Temporal);
    assert_eq!(store.get_neighbors(&a), vec![b], "neighbors are deduped");
    assert_eq!(store.get_incoming(&b), vec![a]);
    assert_eq!(store.incoming_associations(&b).len(), 2);
    assert_eq!(store.stats().edges, 2);
}

#[test]
fn test_neighbors_in_insertion_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let hub = store.learn_concept("hub", None, 1.0, 1.0).unwrap().id;
    let ids: Vec<_> = ["zeta", "alpha", "mid"]
        .iter()
        .map(|c| store.learn_concept(c, None, 1.0, 1.0).unwrap().id)
        .collect();
    for id in &ids {
        store
            .learn_association(hub, *id, AssociationType::Semantic, 0.5)
            .unwrap();
    }
    assert_eq!(store.get_neighbors(&hub), ids);
    assert!(store.get_neighbors(&ids[0]).is_empty());
}

#[test]
fn test_get_concept_is_pure_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let id = store.learn_concept("quiet read", None, 1.0, 1.0).unwrap().id;
    store.flush().unwrap();

    for _ in 0..3 {
        store.get_concept(&id).unwrap();
    }
    assert_eq!(store.get_concept(&id).unwrap().access_count, 0);
    assert!(!store.needs_reconcile(), "reads leave nothing to reconcile");
}

#[test]
fn test_record_access_bumps_count_and_strength() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let id = store.learn_concept("popular", None, 1.0, 1.0).unwrap().id;
    store.flush().unwrap();
    assert!(!store.needs_reconcile());

    assert!(store.record_access(&id));
    assert!(store.record_access(&id));
    assert!(!store.record_access(&ConceptId::from_content("unknown")));

    let concept = store.get_concept(&id).unwrap();
    assert_eq!(concept.access_count, 2);
    assert!((concept.strength - (1.0 + 2.0 * ACCESS_STRENGTH_BOOST)).abs() < 1e-6);
    assert!(store.needs_reconcile(), "access changes wait for reconciliation");
}

#[test]
fn test_concurrent_access_counts_are_exact() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open_store(&dir));
    let id = store.learn_concept("contended", None, 0.0, 1.0).unwrap().id;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..250 {
                    store.record_access(&id);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.get_concept(&id).unwrap().access_count, 2000);
}

#[test]
fn test_flush_resets_pending_and_truncates_log() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    store.learn_concept("one", None, 1.0, 1.0).unwrap();
    store.learn_concept("two", None, 1.0, 1.0).unwrap();
    assert_eq!(store.stats().pending, 2);

    store.flush().unwrap();
    let stats = store.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.reconciliations, 1);
    assert_eq!(stats.written, 2);
    assert!(store.snapshot_path().exists());
    assert_eq!(std::fs::metadata(store.wal_path()).unwrap().len(), 0);
}

#[test]
fn test_token_index() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let a = store.learn_concept("Gravity bends light", None, 1.0, 1.0).unwrap().id;
    let b = store.learn_concept("light travels fast", None, 1.0, 1.0).unwrap().id;

    assert_eq!(store.concepts_with_token("light"), vec![a, b]);
    assert_eq!(store.concepts_with_token("gravity"), vec![a]);
    assert!(store.concepts_with_token("the").is_empty());
}

#[test]
fn test_sequences_are_monotonic() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let a = store.learn_concept("first", None, 1.0, 1.0).unwrap();
    let b = store.learn_concept("second", None, 1.0, 1.0).unwrap();
    let seq = store
        .learn_association(a.id, b.id, AssociationType::Temporal, 1.0)
        .unwrap();
    assert_eq!((a.sequence, b.sequence, seq), (1, 2, 3));
    assert_eq!(store.read().last_sequence(), 3);
}
