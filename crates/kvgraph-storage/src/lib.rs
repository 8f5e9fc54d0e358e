//! Key-value backends for kvgraph.
//!
//! Provides the [`KeyValueStore`] trait, the capability surface the graph
//! engine is written against, plus the [`InMemoryStore`] and
//! [`SqliteStore`] backends. A [`RedisStore`] adapter is available behind
//! the `redis` cargo feature.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: KeyValueStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL schema and migration setup
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod memory;
#[cfg(feature = "redis")]
pub mod redis_store;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use memory::InMemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use sqlite::SqliteStore;
pub use traits::{KeyKind, KeyValueStore};
