//! Redis implementation of [`KeyValueStore`] (cargo feature `redis`).
//!
//! Each capability maps onto exactly one Redis command, so per-key
//! atomicity comes from Redis itself. A single connection is shared behind
//! a mutex; Redis pipelines commands on one connection anyway.

use std::collections::HashMap;

use parking_lot::Mutex;
use redis::Commands;

use crate::error::StorageError;
use crate::traits::KeyValueStore;

/// Redis-backed implementation of [`KeyValueStore`].
pub struct RedisStore {
    conn: Mutex<redis::Connection>,
}

impl RedisStore {
    /// Connects to the Redis server at `url` (e.g. `redis://localhost:6379/0`).
    pub fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_connection()?;
        tracing::info!("connected redis key-value store at {}", url);
        Ok(RedisStore {
            conn: Mutex::new(conn),
        })
    }
}

/// Escapes glob metacharacters so `prefix` matches literally in `SCAN MATCH`.
fn glob_escape(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('*');
    escaped
}

impl KeyValueStore for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.conn.lock().exists(key)?)
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.conn.lock().get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.lock().set::<_, _, ()>(key, value)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let removed: i64 = self.conn.lock().del(key)?;
        Ok(removed > 0)
    }

    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError> {
        if fields.is_empty() {
            return Ok(());
        }
        self.conn.lock().hset_multiple::<_, _, _, ()>(key, fields)?;
        Ok(())
    }

    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        Ok(self.conn.lock().hgetall(key)?)
    }

    fn hash_exists_field(&self, key: &str, field: &str) -> Result<bool, StorageError> {
        Ok(self.conn.lock().hexists(key, field)?)
    }

    fn hash_delete(&self, key: &str, fields: &[String]) -> Result<usize, StorageError> {
        if fields.is_empty() {
            return Ok(0);
        }
        Ok(self.conn.lock().hdel(key, fields)?)
    }

    fn set_add(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        let added: i64 = self.conn.lock().sadd(key, member)?;
        Ok(added == 1)
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.conn.lock().smembers(key)?)
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        let removed: i64 = self.conn.lock().srem(key, member)?;
        Ok(removed == 1)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut conn = self.conn.lock();
        let keys: Vec<String> = conn.scan_match(glob_escape(prefix))?.collect();
        Ok(keys)
    }
}
