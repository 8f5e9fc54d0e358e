//! Node identity.
//!
//! [`NodeId`] is an opaque string newtype. Ids are always held in canonical
//! form: a `node:` decoration supplied by a caller (for example a value key
//! handed back by `store_node`) is stripped on construction, so the same
//! node can never be addressed under two different storage keys.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys;

/// Canonical (undecorated) node identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Generates a fresh, globally unique id (UUID v4).
    pub fn generate() -> Self {
        NodeId(Uuid::new_v4().to_string())
    }

    /// Builds an id from any string, stripping a `node:` decoration.
    pub fn new(raw: impl AsRef<str>) -> Self {
        NodeId(keys::node_id_from_key(raw.as_ref()).to_string())
    }

    /// Wraps an id read back from storage, which is canonical already.
    ///
    /// Skips prefix stripping: an id whose canonical form itself begins
    /// with `node:` must not lose another layer on the way out.
    pub fn from_canonical(raw: impl Into<String>) -> Self {
        NodeId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        NodeId::new(raw)
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        match raw.strip_prefix(keys::NODE_PREFIX) {
            Some(stripped) => NodeId(stripped.to_string()),
            None => NodeId(raw),
        }
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
