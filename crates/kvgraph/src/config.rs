//! Graph configuration.
//!
//! Read from environment variables:
//! - `KVGRAPH_BACKEND`: `memory` (default), `sqlite` or `redis`
//! - `KVGRAPH_SQLITE_PATH`: database file for the sqlite backend (default: "kvgraph.db")
//! - `KVGRAPH_REDIS_URL`: server URL for the redis backend (default: "redis://127.0.0.1:6379/0")
//! - `KVGRAPH_STREAM_CAPACITY`: traversal channel bound (default: 64)

use std::sync::Arc;

use kvgraph_storage::{InMemoryStore, KeyValueStore, SqliteStore};

use crate::error::GraphError;

pub const DEFAULT_SQLITE_PATH: &str = "kvgraph.db";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Which key-value backend to open.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendConfig {
    #[default]
    Memory,
    Sqlite {
        path: String,
    },
    Redis {
        url: String,
    },
}

/// Everything needed to build a [`crate::KvGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    pub backend: BackendConfig,
    /// Bound of the channel between traversal producers and the consumer.
    pub stream_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        GraphConfig {
            backend: BackendConfig::Memory,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

impl GraphConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, GraphError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GraphError> {
        let backend = match lookup("KVGRAPH_BACKEND").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => BackendConfig::Memory,
            Some("sqlite") => BackendConfig::Sqlite {
                path: lookup("KVGRAPH_SQLITE_PATH")
                    .unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string()),
            },
            Some("redis") => BackendConfig::Redis {
                url: lookup("KVGRAPH_REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            },
            Some(other) => {
                return Err(GraphError::Config {
                    reason: format!("unknown backend '{other}'"),
                })
            }
        };

        let stream_capacity = match lookup("KVGRAPH_STREAM_CAPACITY") {
            Some(raw) => raw.trim().parse().map_err(|_| GraphError::Config {
                reason: format!("KVGRAPH_STREAM_CAPACITY must be a non-negative integer, got '{raw}'"),
            })?,
            None => DEFAULT_STREAM_CAPACITY,
        };

        Ok(GraphConfig {
            backend,
            stream_capacity,
        })
    }
}

/// Opens the backend described by `config`.
pub fn open_store(config: &BackendConfig) -> Result<Arc<dyn KeyValueStore>, GraphError> {
    let store: Arc<dyn KeyValueStore> = match config {
        BackendConfig::Memory => Arc::new(InMemoryStore::new()),
        BackendConfig::Sqlite { path } => Arc::new(SqliteStore::new(path)?),
        BackendConfig::Redis { url } => open_redis(url)?,
    };
    tracing::info!("opened {} backend", store.backend_name());
    Ok(store)
}

#[cfg(feature = "redis")]
fn open_redis(url: &str) -> Result<Arc<dyn KeyValueStore>, GraphError> {
    Ok(Arc::new(kvgraph_storage::RedisStore::connect(url)?))
}

#[cfg(not(feature = "redis"))]
fn open_redis(url: &str) -> Result<Arc<dyn KeyValueStore>, GraphError> {
    Err(GraphError::Config {
        reason: format!("cannot open {url}: kvgraph was built without the `redis` feature"),
    })
}
