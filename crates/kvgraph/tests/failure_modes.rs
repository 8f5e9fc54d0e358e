//! Partial-failure behavior of composite operations, driven by a backend
//! wrapper that fails selected calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use kvgraph::{
    init_tracing, GraphError, Inconsistency, InMemoryStore, KeyValueStore, KvGraph, Node,
    Relation, StorageError,
};

/// Delegates to an in-memory store, failing set additions or hash field
/// deletions on demand and counting whole-hash reads. Has no `scan_prefix`.
#[derive(Default)]
struct FaultyStore {
    inner: InMemoryStore,
    fail_set_add: AtomicBool,
    fail_hash_delete: AtomicBool,
    hash_reads: AtomicUsize,
}

impl FaultyStore {
    fn injected(flag: &AtomicBool, operation: &str) -> Result<(), StorageError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable {
                reason: format!("injected {operation} failure"),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FaultyStore {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.exists(key)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.delete(key)
    }

    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError> {
        self.inner.hash_set(key, fields)
    }

    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        self.hash_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.hash_get_all(key)
    }

    fn hash_exists_field(&self, key: &str, field: &str) -> Result<bool, StorageError> {
        self.inner.hash_exists_field(key, field)
    }

    fn hash_delete(&self, key: &str, fields: &[String]) -> Result<usize, StorageError> {
        Self::injected(&self.fail_hash_delete, "hash_delete")?;
        self.inner.hash_delete(key, fields)
    }

    fn set_add(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        Self::injected(&self.fail_set_add, "set_add")?;
        self.inner.set_add(key, member)
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>, StorageError> {
        self.inner.set_members(key)
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        self.inner.set_remove(key, member)
    }
}

fn faulty_graph() -> KvGraph<FaultyStore> {
    init_tracing();
    KvGraph::new(FaultyStore::default())
}

#[test]
fn test_failed_backward_write_leaves_detectable_gap() {
    let graph = faulty_graph();
    graph.store().fail_set_add.store(true, Ordering::SeqCst);

    let err = graph
        .store_relation(&Relation::new("a", "b").meta("env", "dev"))
        .unwrap_err();
    assert!(matches!(err, GraphError::Backend(StorageError::Unavailable { .. })));

    // The forward half landed; the backward half did not.
    assert_eq!(graph.child_nodes(&"a".into()).count(), 1);
    assert_eq!(graph.parent_nodes(&"b".into()).count(), 0);

    let report = graph.check_node(&"a".into()).unwrap();
    assert_eq!(
        report.issues,
        vec![Inconsistency::MissingBackward {
            host: "a".into(),
            target: "b".into(),
        }]
    );

    // Repeating the write once the backend recovers closes the gap.
    graph.store().fail_set_add.store(false, Ordering::SeqCst);
    let retry = graph
        .store_relation(&Relation::new("a", "b").meta("env", "dev"))
        .unwrap();
    assert!(retry.edge_existed);
    assert!(graph.check_node(&"a".into()).unwrap().is_consistent());
}

#[test]
fn test_cascade_aborts_at_first_failure_and_resumes() {
    let graph = faulty_graph();
    graph.store_node(&Node::with_id("a", 1)).unwrap();
    graph.store_relation(&Relation::new("a", "b")).unwrap();
    graph.store_relation(&Relation::new("c", "a")).unwrap();

    graph.store().fail_hash_delete.store(true, Ordering::SeqCst);
    assert!(graph.delete_node(&"a".into()).is_err());

    // Payload survives an aborted cascade.
    assert_eq!(graph.retrieve_node::<i32>(&"a".into()).unwrap().data, 1);

    graph.store().fail_hash_delete.store(false, Ordering::SeqCst);
    assert_eq!(graph.delete_node(&"a".into()).unwrap(), 2);
    assert!(graph.store().inner.is_empty());
}

#[test]
fn test_whole_keyspace_check_needs_prefix_scans() {
    let graph = faulty_graph();
    graph.store_relation(&Relation::new("a", "b")).unwrap();

    match graph.check_all() {
        Err(GraphError::Unimplemented { backend, operation }) => {
            assert_eq!(backend, "faulty");
            assert_eq!(operation, "scan_prefix");
        }
        other => panic!("expected Unimplemented, got: {:?}", other),
    }
    // Per-node checks need no scan.
    assert!(graph.check_node(&"a".into()).unwrap().is_consistent());
}

#[test]
fn test_shared_backend_sees_writes_from_every_handle() {
    let store = Arc::new(FaultyStore::default());
    let writer = KvGraph::from_shared(Arc::clone(&store));
    let reader = KvGraph::from_shared(store);

    writer.store_relation(&Relation::new("w", "r")).unwrap();
    assert_eq!(reader.parent_nodes(&"r".into()).count(), 1);
}

#[test]
fn test_relation_writes_never_read_the_whole_forward_hash() {
    let graph = faulty_graph();

    let first = graph.store_relation(&Relation::new("hub", "t0")).unwrap();
    assert!(!first.existed_before);
    assert!(!first.edge_existed);

    for i in 1..50 {
        let write = graph
            .store_relation(&Relation::new("hub", format!("t{i}")))
            .unwrap();
        assert!(write.existed_before);
        assert!(!write.edge_existed);
    }

    let repeat = graph
        .store_relation(&Relation::new("hub", "t7").meta("k", "v"))
        .unwrap();
    assert!(repeat.existed_before);
    assert!(repeat.edge_existed);

    assert_eq!(graph.store().hash_reads.load(Ordering::SeqCst), 0);
    assert_eq!(graph.child_nodes(&"hub".into()).count(), 50);
}
