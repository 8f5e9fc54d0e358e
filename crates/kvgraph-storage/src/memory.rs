//! In-memory implementation of [`KeyValueStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests, ephemeral graphs,
//! and anywhere persistence isn't needed. Keys live in a `DashMap`; every
//! capability call holds the shard lock of exactly one key for its whole
//! duration, which gives the same per-key atomicity a networked store does.

use std::collections::{HashMap, HashSet};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::StorageError;
use crate::traits::{KeyKind, KeyValueStore};

/// A structure stored under one key.
#[derive(Debug, Clone)]
enum Value {
    Scalar(String),
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

impl Value {
    fn kind(&self) -> KeyKind {
        match self {
            Value::Scalar(_) => KeyKind::Scalar,
            Value::Hash(_) => KeyKind::Hash,
            Value::Set(_) => KeyKind::Set,
        }
    }
}

fn wrong_kind(key: &str, expected: KeyKind, found: &Value) -> StorageError {
    StorageError::WrongKind {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

/// In-memory implementation of [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: DashMap<String, Value>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            entries: DashMap::new(),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    // -------------------------------------------------------------------
    // Keys and scalars
    // -------------------------------------------------------------------

    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.contains_key(key))
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entries.get(key) {
            Some(entry) => match entry.value() {
                Value::Scalar(value) => Ok(Some(value.clone())),
                other => Err(wrong_kind(key, KeyKind::Scalar, other)),
            },
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .insert(key.to_string(), Value::Scalar(value.to_string()));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.remove(key).is_some())
    }

    // -------------------------------------------------------------------
    // Hashes
    // -------------------------------------------------------------------

    fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError> {
        if fields.is_empty() {
            return Ok(());
        }
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Value::Hash(hash) => {
                    hash.extend(fields.iter().cloned());
                    Ok(())
                }
                other => Err(wrong_kind(key, KeyKind::Hash, other)),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Value::Hash(fields.iter().cloned().collect()));
                Ok(())
            }
        }
    }

    fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        match self.entries.get(key) {
            Some(entry) => match entry.value() {
                Value::Hash(hash) => Ok(hash.clone()),
                other => Err(wrong_kind(key, KeyKind::Hash, other)),
            },
            None => Ok(HashMap::new()),
        }
    }

    fn hash_exists_field(&self, key: &str, field: &str) -> Result<bool, StorageError> {
        match self.entries.get(key) {
            Some(entry) => match entry.value() {
                Value::Hash(hash) => Ok(hash.contains_key(field)),
                other => Err(wrong_kind(key, KeyKind::Hash, other)),
            },
            None => Ok(false),
        }
    }

    fn hash_delete(&self, key: &str, fields: &[String]) -> Result<usize, StorageError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let (removed, now_empty) = match occupied.get_mut() {
                    Value::Hash(hash) => {
                        let removed = fields
                            .iter()
                            .filter(|field| hash.remove(field.as_str()).is_some())
                            .count();
                        (removed, hash.is_empty())
                    }
                    other => return Err(wrong_kind(key, KeyKind::Hash, other)),
                };
                if now_empty {
                    occupied.remove();
                }
                Ok(removed)
            }
            Entry::Vacant(_) => Ok(0),
        }
    }

    // -------------------------------------------------------------------
    // Sets
    // -------------------------------------------------------------------

    fn set_add(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => match occupied.get_mut() {
                Value::Set(set) => Ok(set.insert(member.to_string())),
                other => Err(wrong_kind(key, KeyKind::Set, other)),
            },
            Entry::Vacant(vacant) => {
                vacant.insert(Value::Set(HashSet::from([member.to_string()])));
                Ok(true)
            }
        }
    }

    fn set_members(&self, key: &str) -> Result<Vec<String>, StorageError> {
        match self.entries.get(key) {
            Some(entry) => match entry.value() {
                Value::Set(set) => Ok(set.iter().cloned().collect()),
                other => Err(wrong_kind(key, KeyKind::Set, other)),
            },
            None => Ok(Vec::new()),
        }
    }

    fn set_remove(&self, key: &str, member: &str) -> Result<bool, StorageError> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let (removed, now_empty) = match occupied.get_mut() {
                    Value::Set(set) => (set.remove(member), set.is_empty()),
                    other => return Err(wrong_kind(key, KeyKind::Set, other)),
                };
                if now_empty {
                    occupied.remove();
                }
                Ok(removed)
            }
            Entry::Vacant(_) => Ok(false),
        }
    }

    // -------------------------------------------------------------------
    // Optional capabilities
    // -------------------------------------------------------------------

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_scalar_roundtrip() {
        let store = InMemoryStore::new();
        assert!(!store.exists("k").unwrap());
        assert_eq!(store.get("k").unwrap(), None);

        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert!(store.exists("k").unwrap());
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));

        assert!(store.delete("k").unwrap());
        assert!(!store.delete("k").unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_hash_fields_merge_and_vanish_when_empty() {
        let store = InMemoryStore::new();
        store.hash_set("h", &fields(&[("a", "1"), ("b", "2")])).unwrap();
        store.hash_set("h", &fields(&[("b", "3")])).unwrap();

        let all = store.hash_get_all("h").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["b"], "3");
        assert!(store.hash_exists_field("h", "a").unwrap());
        assert!(!store.hash_exists_field("h", "c").unwrap());
        assert!(!store.hash_exists_field("missing", "a").unwrap());

        let removed = store
            .hash_delete("h", &["a".to_string(), "zzz".to_string()])
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.exists("h").unwrap());

        store.hash_delete("h", &["b".to_string()]).unwrap();
        assert!(!store.exists("h").unwrap());
        assert!(store.hash_get_all("h").unwrap().is_empty());
    }

    #[test]
    fn test_empty_hash_set_creates_nothing() {
        let store = InMemoryStore::new();
        store.hash_set("h", &[]).unwrap();
        assert!(!store.exists("h").unwrap());
    }

    #[test]
    fn test_set_membership() {
        let store = InMemoryStore::new();
        assert!(store.set_add("s", "x").unwrap());
        assert!(!store.set_add("s", "x").unwrap());
        assert!(store.set_add("s", "y").unwrap());

        let mut members = store.set_members("s").unwrap();
        members.sort();
        assert_eq!(members, vec!["x", "y"]);

        assert!(store.set_remove("s", "x").unwrap());
        assert!(!store.set_remove("s", "x").unwrap());
        assert!(store.set_remove("s", "y").unwrap());
        assert!(!store.exists("s").unwrap());
        assert!(!store.set_remove("missing", "x").unwrap());
    }

    #[test]
    fn test_wrong_kind_is_reported() {
        let store = InMemoryStore::new();
        store.set("k", "scalar").unwrap();

        match store.hash_get_all("k").unwrap_err() {
            StorageError::WrongKind {
                key,
                expected,
                found,
            } => {
                assert_eq!(key, "k");
                assert_eq!(expected, KeyKind::Hash);
                assert_eq!(found, KeyKind::Scalar);
            }
            other => panic!("expected WrongKind, got: {:?}", other),
        }
        assert!(store.set_add("k", "m").is_err());
        assert!(store.hash_exists_field("k", "f").is_err());

        // `set` overwrites whatever the key held.
        store.set_add("s", "m").unwrap();
        store.set("s", "now scalar").unwrap();
        assert_eq!(store.get("s").unwrap().as_deref(), Some("now scalar"));
    }

    #[test]
    fn test_scan_prefix() {
        let store = InMemoryStore::new();
        store.set("node:a", "{}").unwrap();
        store.set("node:b", "{}").unwrap();
        store.set_add("parentOf:a", "b").unwrap();

        let mut keys = store.scan_prefix("node:").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["node:a", "node:b"]);
        assert!(store.scan_prefix("childrenOf:").unwrap().is_empty());
    }
}
