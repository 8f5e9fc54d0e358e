//! Directed, metadata-bearing relations between nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::NodeId;

/// Edge metadata. Ordered so relations compare and hash structurally.
pub type Metadata = BTreeMap<String, String>;

/// A directed edge `host -> target`.
///
/// Endpoints are [`NodeId`]s and therefore always canonical, whatever
/// decoration the caller passed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub host: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Relation {
    /// A relation with no metadata.
    pub fn new(host: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self::with_metadata(host, target, Metadata::new())
    }

    pub fn with_metadata(
        host: impl Into<NodeId>,
        target: impl Into<NodeId>,
        metadata: Metadata,
    ) -> Self {
        Relation {
            host: host.into(),
            target: target.into(),
            metadata,
        }
    }

    /// Builder-style metadata entry.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns `true` if `key` maps to exactly `value`.
    pub fn has_metadata(&self, key: &str, value: &str) -> bool {
        self.metadata.get(key).is_some_and(|v| v == value)
    }

    /// The endpoint on the other side of `id`, if `id` is an endpoint.
    pub fn other_end(&self, id: &NodeId) -> Option<&NodeId> {
        if &self.host == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.host)
        } else {
            None
        }
    }
}
