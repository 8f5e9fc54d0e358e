//! The two index structures behind every edge.
//!
//! For an edge `host -> target`:
//! - `childrenOf:<host>` (hash) holds `target:<target>` plus one
//!   `meta:<target>:<key>` field per metadata entry;
//! - `parentOf:<target>` (set) holds `host`.
//!
//! Each structure is written by its own backend call and the pair is not
//! atomic. Writes go forward hash first, backward set second; a failure in
//! between leaves a forward entry without its backward membership. The
//! error is returned, nothing is rolled back, and
//! [`KvGraph::check_node`] reports the gap.

use kvgraph_core::{decode_forward_fields, keys, NodeId, Relation};
use kvgraph_storage::KeyValueStore;

use crate::error::GraphError;
use crate::graph::KvGraph;

/// Outcome of [`KvGraph::store_relation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationWrite {
    /// Forward-adjacency key written, `childrenOf:<host>`.
    pub key: String,
    /// Whether the host's forward hash existed at all before this write.
    /// This is per host: it is `true` for a brand new edge from a host that
    /// already had other children.
    pub existed_before: bool,
    /// Whether this particular edge existed before this write.
    pub edge_existed: bool,
}

impl<S: KeyValueStore + ?Sized> KvGraph<S> {
    /// Creates or updates the edge `relation.host -> relation.target`.
    ///
    /// Metadata is merged field by field: keys present in `relation`
    /// overwrite stored values, other stored keys are left as they are.
    pub fn store_relation(&self, relation: &Relation) -> Result<RelationWrite, GraphError> {
        let host = relation.host.as_str();
        let target = relation.target.as_str();
        let forward = keys::forward_key(host);

        let existed_before = self.store.exists(&forward)?;
        let edge_existed = self
            .store
            .hash_exists_field(&forward, &keys::target_field(target))?;

        let mut fields = Vec::with_capacity(relation.metadata.len() + 1);
        fields.push((keys::target_field(target), target.to_string()));
        fields.extend(
            relation
                .metadata
                .iter()
                .map(|(key, value)| (keys::meta_field(target, key), value.clone())),
        );
        self.store.hash_set(&forward, &fields)?;

        if edge_existed {
            tracing::debug!("updating relation {} -> {}", host, target);
        } else {
            tracing::debug!("creating relation {} -> {}", host, target);
        }

        if let Err(err) = self.store.set_add(&keys::backward_key(target), host) {
            tracing::warn!(
                "relation {} -> {} is in the forward index only: backward update failed: {}",
                host,
                target,
                err
            );
            return Err(err.into());
        }

        Ok(RelationWrite {
            key: forward,
            existed_before,
            edge_existed,
        })
    }

    /// Removes the edge `host -> target` from both indices.
    ///
    /// Only the membership field of `target` and the metadata fields that
    /// decode to exactly `target` are removed; edges to other targets,
    /// including ones whose id shares a prefix with `target`, are left
    /// intact. Removing a missing edge is a no-op.
    pub fn delete_relation(&self, host: &NodeId, target: &NodeId) -> Result<(), GraphError> {
        let forward = keys::forward_key(host.as_str());
        let raw = self.store.hash_get_all(&forward)?;
        let fields = decode_forward_fields(&raw).field_names_for(target.as_str());

        if !fields.is_empty() {
            self.store.hash_delete(&forward, &fields)?;
            tracing::debug!("deleted relation {} -> {}", host, target);
        }
        self.store
            .set_remove(&keys::backward_key(target.as_str()), host.as_str())?;

        Ok(())
    }
}
