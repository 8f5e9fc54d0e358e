//! [`KvGraph`]: the graph engine bound to one key-value backend.
//!
//! The engine is split by concern across modules, each adding an `impl`
//! block to [`KvGraph`]:
//! - [`crate::node_store`]: node payloads
//! - [`crate::relation_index`]: forward hash and backward set of each edge
//! - [`crate::traversal`]: children / parents / neighborhood streams
//! - [`crate::deletion`]: cascading node removal
//! - [`crate::consistency`]: index gap detection
//!
//! This module wires them to the [`GraphStore`] / [`Researcher`] contract.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use kvgraph_core::{Node, NodeId, Relation};
use kvgraph_storage::KeyValueStore;

use crate::config::{open_store, GraphConfig, DEFAULT_STREAM_CAPACITY};
use crate::error::GraphError;
use crate::node_store::NodeWrite;
use crate::relation_index::RelationWrite;
use crate::stream::RelationStream;
use crate::traits::{GraphStore, Researcher};

/// Graph engine over a shared key-value backend.
///
/// Cloning is cheap and clones share the backend. No lock is held across
/// backend calls: concurrent writers to the same edge rely on the backend's
/// per-key atomicity only (see [`crate::consistency`]).
pub struct KvGraph<S: KeyValueStore + ?Sized = dyn KeyValueStore> {
    pub(crate) store: Arc<S>,
    pub(crate) stream_capacity: usize,
}

impl<S: KeyValueStore + ?Sized> Clone for KvGraph<S> {
    fn clone(&self) -> Self {
        KvGraph {
            store: Arc::clone(&self.store),
            stream_capacity: self.stream_capacity,
        }
    }
}

impl<S: KeyValueStore> KvGraph<S> {
    /// Wraps a backend with the default stream capacity.
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }
}

impl<S: KeyValueStore + ?Sized> KvGraph<S> {
    /// Wraps a backend that is also used elsewhere.
    pub fn from_shared(store: Arc<S>) -> Self {
        KvGraph {
            store,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    /// Sets the bound of the traversal channel.
    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }

    /// The underlying backend.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl KvGraph {
    /// Opens the backend named by `config`.
    pub fn open(config: &GraphConfig) -> Result<Self, GraphError> {
        let store = open_store(&config.backend)?;
        Ok(KvGraph::from_shared(store).with_stream_capacity(config.stream_capacity))
    }
}

impl<S: KeyValueStore + ?Sized + 'static> GraphStore for KvGraph<S> {
    fn store_node<T: Serialize>(&self, node: &Node<T>) -> Result<NodeWrite, GraphError> {
        KvGraph::store_node(self, node)
    }

    fn store_relation(&self, relation: &Relation) -> Result<RelationWrite, GraphError> {
        KvGraph::store_relation(self, relation)
    }

    fn retrieve_node<T: DeserializeOwned>(&self, id: &NodeId) -> Result<Node<T>, GraphError> {
        KvGraph::retrieve_node(self, id)
    }

    fn delete_node(&self, id: &NodeId) -> Result<(), GraphError> {
        KvGraph::delete_node(self, id).map(|_| ())
    }

    fn delete_relation(&self, host: &NodeId, target: &NodeId) -> Result<(), GraphError> {
        KvGraph::delete_relation(self, host, target)
    }
}

impl<S: KeyValueStore + ?Sized + 'static> Researcher for KvGraph<S> {
    fn related_nodes(&self, id: &NodeId) -> RelationStream {
        KvGraph::related_nodes(self, id)
    }

    fn child_nodes(&self, id: &NodeId) -> RelationStream {
        KvGraph::child_nodes(self, id)
    }

    fn parent_nodes(&self, id: &NodeId) -> RelationStream {
        KvGraph::parent_nodes(self, id)
    }

    fn nodes_matching_metadata(&self, id: &NodeId, key: &str, value: &str) -> RelationStream {
        KvGraph::nodes_matching_metadata(self, id, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::traits::Graph;
    use kvgraph_storage::InMemoryStore;
    use serde_json::{json, Value};

    /// Exercises the contract only through trait methods.
    fn roundtrip_through_contract(graph: &impl Graph) {
        graph
            .store_node(&Node::with_id("a", json!({"name": "a"})))
            .unwrap();
        graph.store_relation(&Relation::new("a", "b")).unwrap();

        let node: Node<Value> = graph.retrieve_node(&"a".into()).unwrap();
        assert_eq!(node.data["name"], "a");
        assert_eq!(graph.related_nodes(&"a".into()).count(), 1);

        graph.delete_node(&"a".into()).unwrap();
        assert_eq!(graph.related_nodes(&"b".into()).count(), 0);
    }

    #[test]
    fn test_kv_graph_satisfies_contract() {
        roundtrip_through_contract(&KvGraph::new(InMemoryStore::new()));
    }

    #[test]
    fn test_open_from_config() {
        let config = GraphConfig {
            backend: BackendConfig::Memory,
            stream_capacity: 3,
        };
        let graph = KvGraph::open(&config).unwrap();
        assert_eq!(graph.stream_capacity, 3);
        assert_eq!(graph.store().backend_name(), "memory");
        roundtrip_through_contract(&graph);
    }

    #[test]
    fn test_clones_share_the_backend() {
        let graph = KvGraph::new(InMemoryStore::new());
        let other = graph.clone();
        graph.store_node(&Node::with_id("x", 1)).unwrap();
        assert_eq!(other.retrieve_node::<i32>(&"x".into()).unwrap().data, 1);
    }
}
