//! The [`KeyValueStore`] trait: the capability surface the graph engine
//! requires from a backend.
//!
//! The surface mirrors a Redis-like store restricted to three structures:
//! - **Scalars**: `get` / `set` / `delete`
//! - **Hashes**: `hash_set` / `hash_get_all` / `hash_exists_field` / `hash_delete`
//! - **Sets**: `set_add` / `set_members` / `set_remove`
//!
//! Every call is individually atomic. No call spans more than one key and
//! no multi-key transaction is offered or assumed; the graph engine is
//! written so that it never needs one.
//!
//! Semantics shared by all backends:
//! - a hash or set whose last entry is removed stops existing;
//! - using a key as a different kind of structure than it holds fails with
//!   [`StorageError::WrongKind`], except `set`, which overwrites any kind;
//! - reads of a missing key return an empty result, not an error.

use std::collections::HashMap;
use std::fmt;

use crate::error::StorageError;

/// The kind of structure stored under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Scalar,
    Hash,
    Set,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyKind::Scalar => "scalar",
            KeyKind::Hash => "hash",
            KeyKind::Set => "set",
        };
        f.write_str(name)
    }
}

/// Per-key atomic key-value capability.
///
/// Backends are shared across traversal worker threads, hence the
/// `Send + Sync` bound and `&self` receivers throughout.
pub trait KeyValueStore: Send + Sync {
    /// Short backend name used in logs and errors.
    fn backend_name(&self) -> &'static str;

    // -------------------------------------------------------------------
    // Keys and scalars
    // -------------------------------------------------------------------

    /// Returns `true` if any structure is stored under `key`.
    fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Reads a scalar value.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a scalar value, replacing whatever `key` held.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key` whatever it holds. Returns `true` if it existed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;

    // -------------------------------------------------------------------
    // Hashes
    // -------------------------------------------------------------------

    /// Sets the given fields, leaving other fields untouched.
    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError>;

    /// Reads every field of a hash. A missing key yields an empty map.
    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError>;

    /// Returns `true` if the hash under `key` has `field`.
    fn hash_exists_field(&self, key: &str, field: &str) -> Result<bool, StorageError>;

    /// Removes the given fields. Returns how many were present.
    fn hash_delete(&self, key: &str, fields: &[String]) -> Result<usize, StorageError>;

    // -------------------------------------------------------------------
    // Sets
    // -------------------------------------------------------------------

    /// Adds a member. Returns `true` if it was not already present.
    fn set_add(&self, key: &str, member: &str) -> Result<bool, StorageError>;

    /// Lists the members of a set. A missing key yields an empty list.
    fn set_members(&self, key: &str) -> Result<Vec<String>, StorageError>;

    /// Removes a member. Returns `true` if it was present.
    fn set_remove(&self, key: &str, member: &str) -> Result<bool, StorageError>;

    // -------------------------------------------------------------------
    // Optional capabilities
    // -------------------------------------------------------------------

    /// Lists every key starting with `prefix`.
    ///
    /// Only whole-keyspace maintenance (consistency sweeps) needs this, so
    /// backends may leave it unimplemented.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let _ = prefix;
        Err(StorageError::Unimplemented {
            backend: self.backend_name(),
            operation: "scan_prefix",
        })
    }
}
