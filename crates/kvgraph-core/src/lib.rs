//! Graph data model and storage-key codec for kvgraph.
//!
//! - [`id`]: canonical [`NodeId`]
//! - [`node`]: [`Node`] with an opaque payload
//! - [`relation`]: directed [`Relation`] with string metadata
//! - [`keys`]: mapping of graph concepts onto scalar/hash/set keys

pub mod id;
pub mod keys;
pub mod node;
pub mod relation;

pub use id::NodeId;
pub use keys::{decode_forward_fields, ForwardFields, TargetFields};
pub use node::Node;
pub use relation::{Metadata, Relation};
