//! SQLite implementation of [`KeyValueStore`].
//!
//! [`SqliteStore`] emulates scalars, hashes and sets with one table each
//! (see `migrations/001_initial_schema.sql`). A key's kind is whichever
//! table holds rows for it. Every write runs in its own transaction, so each
//! capability call is atomic, and none spans more than one key.
//!
//! `rusqlite::Connection` is `!Sync`; the connection sits behind a
//! `parking_lot::Mutex` so the store can be shared with traversal workers.

use std::collections::HashMap;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;
use crate::traits::{KeyKind, KeyValueStore};

/// SQLite-backed implementation of [`KeyValueStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        tracing::info!("opened sqlite key-value store at {}", path);
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Which table, if any, holds rows for `key`.
    fn kind_of(conn: &Connection, key: &str) -> Result<Option<KeyKind>, StorageError> {
        let tag: Option<String> = conn.query_row(
            "SELECT CASE
                 WHEN EXISTS(SELECT 1 FROM kv_scalars WHERE key = ?1) THEN 'scalar'
                 WHEN EXISTS(SELECT 1 FROM kv_hash_fields WHERE key = ?1) THEN 'hash'
                 WHEN EXISTS(SELECT 1 FROM kv_set_members WHERE key = ?1) THEN 'set'
             END",
            params![key],
            |row| row.get(0),
        )?;
        Ok(match tag.as_deref() {
            Some("scalar") => Some(KeyKind::Scalar),
            Some("hash") => Some(KeyKind::Hash),
            Some("set") => Some(KeyKind::Set),
            _ => None,
        })
    }

    /// Fails with `WrongKind` if `key` holds something other than `expected`.
    fn ensure_kind(conn: &Connection, key: &str, expected: KeyKind) -> Result<(), StorageError> {
        match Self::kind_of(conn, key)? {
            Some(found) if found != expected => Err(StorageError::WrongKind {
                key: key.to_string(),
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }
}

impl KeyValueStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    // -------------------------------------------------------------------
    // Keys and scalars
    // -------------------------------------------------------------------

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        Ok(Self::kind_of(&conn, key)?.is_some())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock();
        Self::ensure_kind(&conn, key, KeyKind::Scalar)?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_scalars WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM kv_hash_fields WHERE key = ?1", params![key])?;
        tx.execute("DELETE FROM kv_set_members WHERE key = ?1", params![key])?;
        tx.execute(
            "INSERT INTO kv_scalars (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut rows = tx.execute("DELETE FROM kv_scalars WHERE key = ?1", params![key])?;
        rows += tx.execute("DELETE FROM kv_hash_fields WHERE key = ?1", params![key])?;
        rows += tx.execute("DELETE FROM kv_set_members WHERE key = ?1", params![key])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // -------------------------------------------------------------------
    // Hashes
    // -------------------------------------------------------------------

    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::ensure_kind(&tx, key, KeyKind::Hash)?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO kv_hash_fields (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            )?;
            for (field, value) in fields {
                stmt.execute(params![key, field, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        let conn = self.conn.lock();
        Self::ensure_kind(&conn, key, KeyKind::Hash)?;
        let mut stmt =
            conn.prepare_cached("SELECT field, value FROM kv_hash_fields WHERE key = ?1")?;
        let rows = stmt.query_map(params![key], |row| {
            let field: String = row.get(0)?;
            let value: String = row.get(1)?;
            Ok((field, value))
        })?;

        let mut hash = HashMap::new();
        for row in rows {
            let (field, value) = row?;
            hash.insert(field, value);
        }
        Ok(hash)
    }

    fn hash_exists_field(&self, key: &str, field: &str) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        Self::ensure_kind(&conn, key, KeyKind::Hash)?;
        let found = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM kv_hash_fields WHERE key = ?1 AND field = ?2)",
            params![key, field],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn hash_delete(&self, key: &str, fields: &[String]) -> Result<usize, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::ensure_kind(&tx, key, KeyKind::Hash)?;
        let mut removed = 0;
        {
            let mut stmt =
                tx.prepare_cached("DELETE FROM kv_hash_fields WHERE key = ?1 AND field = ?2")?;
            for field in fields {
                removed += stmt.execute(params![key, field])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    // -------------------------------------------------------------------
    // Sets
    // -------------------------------------------------------------------

    fn set_add(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::ensure_kind(&tx, key, KeyKind::Set)?;
        let rows = tx.execute(
            "INSERT OR IGNORE INTO kv_set_members (key, member) VALUES (?1, ?2)",
            params![key, member],
        )?;
        tx.commit()?;
        Ok(rows == 1)
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock();
        Self::ensure_kind(&conn, key, KeyKind::Set)?;
        let mut stmt = conn.prepare_cached("SELECT member FROM kv_set_members WHERE key = ?1")?;
        let members = stmt
            .query_map(params![key], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(members)
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::ensure_kind(&tx, key, KeyKind::Set)?;
        let rows = tx.execute(
            "DELETE FROM kv_set_members WHERE key = ?1 AND member = ?2",
            params![key, member],
        )?;
        tx.commit()?;
        Ok(rows == 1)
    }

    // -------------------------------------------------------------------
    // Optional capabilities
    // -------------------------------------------------------------------

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock();
        // substr comparison instead of LIKE: ids may contain '%' or '_'.
        let mut stmt = conn.prepare_cached(
            "SELECT key FROM kv_scalars WHERE substr(key, 1, length(?1)) = ?1
             UNION
             SELECT DISTINCT key FROM kv_hash_fields WHERE substr(key, 1, length(?1)) = ?1
             UNION
             SELECT DISTINCT key FROM kv_set_members WHERE substr(key, 1, length(?1)) = ?1",
        )?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}
