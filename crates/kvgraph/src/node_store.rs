//! Node payload storage.
//!
//! A node lives under `node:<id>` as the JSON document `{"id", "data"}`.
//! Payloads are opaque: written verbatim and decoded into the type the
//! caller asks for. Relations are not touched here; removing a node with
//! its edges is [`crate::deletion`]'s job.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use kvgraph_core::{keys, Node, NodeId};
use kvgraph_storage::KeyValueStore;

use crate::error::GraphError;
use crate::graph::KvGraph;

/// Outcome of [`KvGraph::store_node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeWrite {
    /// Storage key written, `node:<id>`.
    pub key: String,
    /// Whether a value was stored under the key before this write.
    pub existed_before: bool,
}

/// Stored document shape. The id field is ignored on read: the canonical
/// id the caller asked for is authoritative.
#[derive(Deserialize)]
struct StoredPayload<T> {
    data: T,
}

impl<S: KeyValueStore + ?Sized> KvGraph<S> {
    /// Upserts `node`, replacing any previous payload wholesale.
    pub fn store_node<T: Serialize>(&self, node: &Node<T>) -> Result<NodeWrite, GraphError> {
        let key = keys::node_key(node.id.as_str());
        let existed_before = self.store.exists(&key)?;
        let payload = serde_json::to_string(node).map_err(GraphError::Encode)?;

        if existed_before {
            tracing::debug!("updating node {}", key);
        } else {
            tracing::debug!("creating node {}", key);
        }
        self.store.set(&key, &payload)?;

        Ok(NodeWrite {
            key,
            existed_before,
        })
    }

    /// Reads node `id` and decodes its payload as `T`.
    ///
    /// Fails with [`GraphError::NodeNotFound`] if nothing is stored and with
    /// [`GraphError::Decode`] if the payload does not fit `T`.
    pub fn retrieve_node<T: DeserializeOwned>(&self, id: &NodeId) -> Result<Node<T>, GraphError> {
        let key = keys::node_key(id.as_str());
        let not_found = || GraphError::NodeNotFound { id: id.clone() };

        if !self.store.exists(&key)? {
            return Err(not_found());
        }
        // Deleted between the two calls: same answer as never stored.
        let raw = self.store.get(&key)?.ok_or_else(not_found)?;

        let stored: StoredPayload<T> =
            serde_json::from_str(&raw).map_err(|source| GraphError::Decode {
                id: id.clone(),
                source,
            })?;

        Ok(Node {
            id: id.clone(),
            data: stored.data,
        })
    }

    /// Removes the payload of node `id`, leaving its edges in place.
    ///
    /// Idempotent: returns `false` when there was nothing to remove.
    pub fn delete_node_value(&self, id: &NodeId) -> Result<bool, GraphError> {
        let key = keys::node_key(id.as_str());
        let removed = self.store.delete(&key)?;
        if removed {
            tracing::debug!("deleted node {}", key);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use kvgraph_core::Relation;
    use kvgraph_storage::InMemoryStore;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Server {
        hostname: String,
        cores: u32,
    }

    fn graph() -> KvGraph<InMemoryStore> {
        KvGraph::new(InMemoryStore::new())
    }

    #[test]
    fn test_store_then_retrieve_typed_payload() {
        let graph = graph();
        let node = Node::with_id(
            "node-1",
            Server {
                hostname: "db01".into(),
                cores: 16,
            },
        );

        let write = graph.store_node(&node).unwrap();
        assert_eq!(write.key, "node:node-1");
        assert!(!write.existed_before);

        let back: Node<Server> = graph.retrieve_node(&"node-1".into()).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_decorated_id_returns_canonical_node() {
        let graph = graph();
        graph
            .store_node(&Node::with_id("n", json!({"stuff": "things"})))
            .unwrap();

        let back: Node<HashMap<String, String>> =
            graph.retrieve_node(&NodeId::new("node:n")).unwrap();
        assert_eq!(back.id.as_str(), "n");
        assert_eq!(back.data["stuff"], "things");
    }

    #[test]
    fn test_second_store_reports_existing_and_overwrites() {
        let graph = graph();
        let first = graph
            .store_node(&Node::with_id("n", json!({"a": 1, "b": 2})))
            .unwrap();
        let second = graph
            .store_node(&Node::with_id("n", json!({"c": 3})))
            .unwrap();
        assert!(!first.existed_before);
        assert!(second.existed_before);

        // Full overwrite, not a merge.
        let back: Node<serde_json::Value> = graph.retrieve_node(&"n".into()).unwrap();
        assert_eq!(back.data, json!({"c": 3}));
    }

    #[test]
    fn test_missing_node_is_not_found() {
        let graph = graph();
        match graph.retrieve_node::<serde_json::Value>(&"ghost".into()) {
            Err(GraphError::NodeNotFound { id }) => assert_eq!(id.as_str(), "ghost"),
            other => panic!("expected NodeNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_shape_mismatch_is_decode_error() {
        let graph = graph();
        graph
            .store_node(&Node::with_id("n", json!({"hostname": 42})))
            .unwrap();
        assert!(matches!(
            graph.retrieve_node::<Server>(&"n".into()),
            Err(GraphError::Decode { .. })
        ));
    }

    #[test]
    fn test_delete_value_is_idempotent_and_keeps_edges() {
        let graph = graph();
        graph.store_node(&Node::with_id("a", 1)).unwrap();
        graph.store_relation(&Relation::new("a", "b")).unwrap();

        assert!(graph.delete_node_value(&"a".into()).unwrap());
        assert!(!graph.delete_node_value(&"a".into()).unwrap());
        assert!(graph.retrieve_node::<i32>(&"a".into()).is_err());

        // Dangling now, but still an ordinary edge.
        let children: Vec<Relation> = graph
            .child_nodes(&"a".into())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(children, vec![Relation::new("a", "b")]);
    }
}
