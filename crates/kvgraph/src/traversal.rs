//! Read-side reconstruction of edges from the two indices.
//!
//! Each traversal becomes one or more producers feeding a
//! [`RelationStream`]. `related_nodes` runs the child scan and the parent
//! scan concurrently and merges them; the stream closes only after both
//! scans are finished.
//!
//! A backend read failure is delivered as an `Err` item and ends the scan
//! that hit it.

use std::sync::Arc;

use kvgraph_core::{decode_forward_fields, keys, NodeId, Relation};
use kvgraph_storage::KeyValueStore;

use crate::graph::KvGraph;
use crate::stream::{Producer, RelationSink, RelationStream};

impl<S: KeyValueStore + ?Sized + 'static> KvGraph<S> {
    /// Edges `id -> *`, one per declared target in `id`'s forward hash.
    pub fn child_nodes(&self, id: &NodeId) -> RelationStream {
        RelationStream::merge(
            "child scan",
            self.stream_capacity,
            vec![self.children_producer(id)],
        )
    }

    /// Edges `* -> id`, one per member of `id`'s backward set.
    ///
    /// A member whose forward hash has no entry for `id` (a dangling
    /// backward reference) is still emitted, with empty metadata.
    pub fn parent_nodes(&self, id: &NodeId) -> RelationStream {
        RelationStream::merge(
            "parent scan",
            self.stream_capacity,
            vec![self.parents_producer(id, true)],
        )
    }

    /// Union of [`Self::child_nodes`] and [`Self::parent_nodes`].
    ///
    /// Both scans run concurrently; their interleaving is unspecified. A
    /// self-loop `id -> id` is reported once, by the child scan.
    pub fn related_nodes(&self, id: &NodeId) -> RelationStream {
        RelationStream::merge(
            "neighborhood scan",
            self.stream_capacity,
            vec![self.children_producer(id), self.parents_producer(id, false)],
        )
    }

    /// Edges around `id` whose metadata maps `key` to exactly `value`.
    ///
    /// A linear scan over [`Self::related_nodes`]; no index is consulted.
    pub fn nodes_matching_metadata(&self, id: &NodeId, key: &str, value: &str) -> RelationStream {
        let key = key.to_string();
        let value = value.to_string();
        self.related_nodes(id)
            .filtered(move |relation| relation.has_metadata(&key, &value))
    }

    fn children_producer(&self, id: &NodeId) -> Producer {
        let store = Arc::clone(&self.store);
        let id = id.clone();
        Box::new(move |sink: &RelationSink| scan_children(&*store, &id, sink))
    }

    fn parents_producer(&self, id: &NodeId, include_self_loop: bool) -> Producer {
        let store = Arc::clone(&self.store);
        let id = id.clone();
        Box::new(move |sink: &RelationSink| scan_parents(&*store, &id, include_self_loop, sink))
    }
}

fn scan_children<S: KeyValueStore + ?Sized>(store: &S, id: &NodeId, sink: &RelationSink) {
    let raw = match store.hash_get_all(&keys::forward_key(id.as_str())) {
        Ok(raw) => raw,
        Err(err) => {
            sink.emit(Err(err.into()));
            return;
        }
    };

    let fields = decode_forward_fields(&raw);
    for (target, metadata) in fields.edges() {
        let relation = Relation {
            host: id.clone(),
            target: NodeId::from_canonical(target),
            metadata: metadata.clone(),
        };
        if !sink.emit(Ok(relation)) {
            return;
        }
    }
}

fn scan_parents<S: KeyValueStore + ?Sized>(
    store: &S,
    id: &NodeId,
    include_self_loop: bool,
    sink: &RelationSink,
) {
    let hosts = match store.set_members(&keys::backward_key(id.as_str())) {
        Ok(hosts) => hosts,
        Err(err) => {
            sink.emit(Err(err.into()));
            return;
        }
    };

    for host in hosts {
        if sink.is_cancelled() {
            return;
        }
        if !include_self_loop && host == id.as_str() {
            continue;
        }

        let raw = match store.hash_get_all(&keys::forward_key(&host)) {
            Ok(raw) => raw,
            Err(err) => {
                sink.emit(Err(err.into()));
                return;
            }
        };
        let fields = decode_forward_fields(&raw);
        let metadata = match fields.get(id.as_str()) {
            Some(entry) if entry.declared => entry.metadata.clone(),
            entry => {
                tracing::warn!("dangling backward reference {} -> {}", host, id);
                entry.map(|e| e.metadata.clone()).unwrap_or_default()
            }
        };

        let relation = Relation {
            host: NodeId::from_canonical(host),
            target: id.clone(),
            metadata,
        };
        if !sink.emit(Ok(relation)) {
            return;
        }
    }
}
