//! Storage error types for kvgraph-storage.
//!
//! [`StorageError`] covers every failure a key-value backend can report:
//! driver errors, keys used as the wrong kind of structure, an unusable
//! connection, and capabilities a backend does not offer.

use thiserror::Error;

use crate::traits::KeyKind;

/// Errors produced by key-value backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// The Redis client reported an error.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A key holds a different kind of structure than the operation needs.
    #[error("wrong kind for key '{key}': expected {expected}, found {found}")]
    WrongKind {
        key: String,
        expected: KeyKind,
        found: KeyKind,
    },

    /// The backend could not be reached or is otherwise unusable.
    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },

    /// The backend does not support the requested capability.
    #[error("operation '{operation}' is not supported by the {backend} backend")]
    Unimplemented {
        backend: &'static str,
        operation: &'static str,
    },
}
