//! Nodes: an identity plus an opaque payload.
//!
//! The payload type is a caller choice. It is serialized verbatim on write
//! and decoded into whatever type the caller asks for on read; the graph
//! never inspects it.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// A graph node carrying a payload of type `T`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<T = serde_json::Value> {
    pub id: NodeId,
    pub data: T,
}

impl<T> Node<T> {
    /// Creates a node with a freshly generated id.
    pub fn new(data: T) -> Self {
        Node {
            id: NodeId::generate(),
            data,
        }
    }

    /// Creates a node with a caller-chosen id.
    pub fn with_id(id: impl Into<NodeId>, data: T) -> Self {
        Node {
            id: id.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_nodes_get_distinct_ids() {
        let a = Node::new(1);
        let b = Node::new(1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_stored_shape() {
        let node = Node::with_id("node:n-1", json!({"stuff": "things"}));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value, json!({"id": "n-1", "data": {"stuff": "things"}}));
    }
}
