//! Graph of nodes and metadata-carrying directed relations, stored on a
//! key-value backend.
//!
//! Nodes are opaque JSON payloads under `node:<id>`. Every relation is kept
//! twice: in the host's forward hash (`childrenOf:<host>`) together with its
//! metadata, and in the target's backward set (`parentOf:<target>`). The
//! engine is written against [`KeyValueStore`] and runs on any backend that
//! offers scalars, hashes and sets.
//!
//! # Modules
//!
//! - [`graph`]: the [`KvGraph`] engine and its contract wiring
//! - [`traits`]: [`GraphStore`], [`Researcher`] and [`Graph`]
//! - [`node_store`]: node payload reads and writes
//! - [`relation_index`]: relation writes and deletes on both indices
//! - [`traversal`]: child, parent and neighborhood streams
//! - [`stream`]: the bounded, cancellable [`RelationStream`]
//! - [`deletion`]: cascading node removal
//! - [`consistency`]: forward/backward index gap detection
//! - [`config`]: environment-driven backend selection
//! - [`telemetry`]: tracing subscriber setup
//! - [`error`]: GraphError enum

pub mod config;
pub mod consistency;
pub mod deletion;
pub mod error;
pub mod graph;
pub mod node_store;
pub mod relation_index;
pub mod stream;
pub mod telemetry;
pub mod traits;
pub mod traversal;

// Re-export key types for ergonomic use.
pub use config::{open_store, BackendConfig, GraphConfig};
pub use consistency::{ConsistencyReport, Inconsistency};
pub use error::GraphError;
pub use graph::KvGraph;
pub use node_store::NodeWrite;
pub use relation_index::RelationWrite;
pub use stream::{CancelToken, RelationResult, RelationStream};
pub use telemetry::init_tracing;
pub use traits::{Graph, GraphStore, Researcher};

pub use kvgraph_core::{Metadata, Node, NodeId, Relation};
pub use kvgraph_storage::{InMemoryStore, KeyKind, KeyValueStore, SqliteStore, StorageError};
#[cfg(feature = "redis")]
pub use kvgraph_storage::RedisStore;
