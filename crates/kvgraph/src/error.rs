//! Graph error types.
//!
//! [`GraphError`] is the single error type of every public graph operation.
//! Backend failures are carried unchanged inside [`GraphError::Backend`];
//! the engine applies no retry or backoff. Composite operations (relation
//! writes, cascading deletes) stop at the first error and do not roll back
//! the steps already applied.

use kvgraph_core::NodeId;
use kvgraph_storage::StorageError;
use thiserror::Error;

/// Errors produced by graph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No value is stored for the node.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// The stored payload does not fit the requested type.
    #[error("cannot decode payload of node {id}: {source}")]
    Decode {
        id: NodeId,
        #[source]
        source: serde_json::Error,
    },

    /// The payload could not be serialized.
    #[error("cannot encode node payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// The key-value backend failed.
    #[error("backend error: {0}")]
    Backend(#[source] StorageError),

    /// The backend does not support an operation this call needs.
    #[error("operation '{operation}' is not implemented by the {backend} backend")]
    Unimplemented {
        backend: &'static str,
        operation: &'static str,
    },

    /// A traversal producer died before finishing.
    #[error("traversal failed: {reason}")]
    Traversal { reason: String },

    /// Configuration could not be turned into a graph.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl From<StorageError> for GraphError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unimplemented { backend, operation } => {
                GraphError::Unimplemented { backend, operation }
            }
            other => GraphError::Backend(other),
        }
    }
}
