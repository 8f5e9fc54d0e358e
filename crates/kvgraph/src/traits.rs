//! The graph contract.
//!
//! - [`GraphStore`]: writes, point reads and deletes
//! - [`Researcher`]: neighborhood traversals
//! - [`Graph`]: both, implemented for anything that is both
//!
//! [`crate::KvGraph`] implements the contract on top of any
//! [`kvgraph_storage::KeyValueStore`]; other graph implementations (test
//! doubles, decorators) can be swapped in without touching callers.

use serde::de::DeserializeOwned;
use serde::Serialize;

use kvgraph_core::{Node, NodeId, Relation};

use crate::error::GraphError;
use crate::node_store::NodeWrite;
use crate::relation_index::RelationWrite;
use crate::stream::RelationStream;

/// Write side of the graph contract.
pub trait GraphStore {
    /// Upserts a node, reporting whether a value already existed.
    fn store_node<T: Serialize>(&self, node: &Node<T>) -> Result<NodeWrite, GraphError>;

    /// Creates or updates the edge `relation.host -> relation.target`.
    fn store_relation(&self, relation: &Relation) -> Result<RelationWrite, GraphError>;

    /// Reads a node, decoding its payload as `T`.
    fn retrieve_node<T: DeserializeOwned>(&self, id: &NodeId) -> Result<Node<T>, GraphError>;

    /// Removes a node together with every edge referencing it.
    fn delete_node(&self, id: &NodeId) -> Result<(), GraphError>;

    /// Removes the edge `host -> target`. Missing edges are a no-op.
    fn delete_relation(&self, host: &NodeId, target: &NodeId) -> Result<(), GraphError>;
}

/// Read side of the graph contract.
///
/// Every method re-reads current state and returns a lazy stream.
pub trait Researcher {
    /// Children and parents of `id`, in no particular order.
    fn related_nodes(&self, id: &NodeId) -> RelationStream;

    /// Edges `id -> *`.
    fn child_nodes(&self, id: &NodeId) -> RelationStream;

    /// Edges `* -> id`.
    fn parent_nodes(&self, id: &NodeId) -> RelationStream;

    /// Edges around `id` whose metadata maps `key` to exactly `value`.
    fn nodes_matching_metadata(&self, id: &NodeId, key: &str, value: &str) -> RelationStream;
}

/// A complete graph: store plus researcher.
pub trait Graph: GraphStore + Researcher {}

impl<G: GraphStore + Researcher + ?Sized> Graph for G {}
