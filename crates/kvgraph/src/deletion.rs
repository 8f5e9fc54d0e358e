//! Cascading node removal.
//!
//! `delete_node` first enumerates the whole neighborhood, then removes the
//! edges one at a time, then removes the payload. Edge removals run
//! sequentially: two concurrent field deletions against the same forward
//! hash could otherwise interleave with the read that picks the fields.
//!
//! Failure is partial-effect. The first error aborts the cascade; edges
//! already removed stay removed, the remaining edges and the payload stay
//! in place. Calling `delete_node` again resumes where it stopped.

use kvgraph_core::{NodeId, Relation};
use kvgraph_storage::KeyValueStore;

use crate::error::GraphError;
use crate::graph::KvGraph;

impl<S: KeyValueStore + ?Sized + 'static> KvGraph<S> {
    /// Removes node `id` together with every edge that references it.
    ///
    /// Returns how many edges were removed. Deleting a node that has no
    /// edges and no payload is a no-op.
    pub fn delete_node(&self, id: &NodeId) -> Result<usize, GraphError> {
        let relations: Vec<Relation> = self.related_nodes(id).collect::<Result<_, _>>()?;

        for relation in &relations {
            self.delete_relation(&relation.host, &relation.target)?;
        }
        if !relations.is_empty() {
            tracing::debug!("removed {} relation(s) of node {}", relations.len(), id);
        }

        self.delete_node_value(id)?;
        Ok(relations.len())
    }
}
