//! Registry Store Module
//!
//! Main registry engine: three indexes over the same set of records, guarded
//! by one lock so no reader can observe them out of step.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::registry::{ExpiryIndex, Record};

// == Indexes ==
/// The three views over the live records. Only reachable through the lock.
#[derive(Debug, Default)]
struct Indexes {
    /// key -> record
    by_key: HashMap<String, Record>,
    /// value -> keys carrying that value, oldest first
    by_value: HashMap<String, Vec<String>>,
    /// expiry -> keys
    by_expiry: ExpiryIndex,
}

impl Indexes {
    fn insert(&mut self, record: Record) {
        self.by_value
            .entry(record.value.clone())
            .or_default()
            .push(record.key.clone());
        self.by_expiry.insert(record.expiry, &record.key);
        self.by_key.insert(record.key.clone(), record);
    }

    fn remove(&mut self, key: &str) -> Option<Record> {
        let record = self.by_key.remove(key)?;

        if let Some(keys) = self.by_value.get_mut(&record.value) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.by_value.remove(&record.value);
            }
        }
        self.by_expiry.remove(record.expiry, key);

        Some(record)
    }
}

// == Registry Store ==
/// Concurrent key registry with reverse lookup and expiry indexing.
///
/// Writers (`save`, `remove`, `remove_expired`) hold the write lock only for
/// the three-index update. Readers share the read lock and never see a
/// half-applied write. Nothing here performs I/O or notifies listeners, so
/// the critical sections stay short and cannot call back into the store.
#[derive(Debug, Default)]
pub struct RegistryStore {
    indexes: RwLock<Indexes>,
}

impl RegistryStore {
    // == Constructor ==
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // == Save ==
    /// Inserts a new record.
    ///
    /// Fails with `DuplicateKey` if the key is held by a live record, leaving
    /// that record untouched. Fails with `InvalidValue` for an empty value or
    /// a zero expiry.
    pub fn save(&self, key: &str, value: &str, expiry: u64) -> Result<()> {
        if value.is_empty() {
            return Err(RegistryError::InvalidValue(
                "Value cannot be empty".to_string(),
            ));
        }
        if expiry == 0 {
            return Err(RegistryError::InvalidValue(
                "Expiry must be a positive timestamp".to_string(),
            ));
        }

        let mut indexes = self.indexes.write();
        if indexes.by_key.contains_key(key) {
            return Err(RegistryError::DuplicateKey(key.to_string()));
        }
        indexes.insert(Record::new(key, value, expiry));

        Ok(())
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    pub fn get(&self, key: &str) -> Result<String> {
        self.record(key).map(|record| record.value)
    }

    // == Record ==
    /// Retrieves the full record stored under `key`.
    pub fn record(&self, key: &str) -> Result<Record> {
        self.indexes
            .read()
            .by_key
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    // == Exists ==
    pub fn exists(&self, key: &str) -> bool {
        self.indexes.read().by_key.contains_key(key)
    }

    // == Remove ==
    /// Removes `key` from all indexes, returning the removed record.
    ///
    /// Removing an absent key is a no-op and returns `None`.
    pub fn remove(&self, key: &str) -> Option<Record> {
        self.indexes.write().remove(key)
    }

    // == Remove Expired ==
    /// Removes `key` only if its live record has expired as of `now`.
    ///
    /// A key listed by `list_expired` may have been deleted and re-created
    /// with a later expiry before the caller gets to it; this keeps the new
    /// record alive.
    pub fn remove_expired(&self, key: &str, now: u64) -> Option<Record> {
        let mut indexes = self.indexes.write();
        match indexes.by_key.get(key) {
            Some(record) if record.is_expired_at(now) => indexes.remove(key),
            Some(_) => {
                debug!(key, "Skipping eviction of key re-created with a later expiry");
                None
            }
            None => None,
        }
    }

    // == Find By Value ==
    /// Returns the key of the most recently saved live record holding `value`.
    pub fn find_by_value(&self, value: &str) -> Option<String> {
        self.indexes
            .read()
            .by_value
            .get(value)
            .and_then(|keys| keys.last().cloned())
    }

    // == List Expired ==
    /// Returns every key whose expiry is <= `now`, in no particular order.
    pub fn list_expired(&self, now: u64) -> Vec<String> {
        self.indexes.read().by_expiry.expired_as_of(now)
    }

    // == Length ==
    /// Returns the current number of live records.
    pub fn len(&self) -> usize {
        self.indexes.read().by_key.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.indexes.read().by_key.is_empty()
    }

    /// Checks that the three indexes describe the same set of records.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let indexes = self.indexes.read();

        let value_entries: usize = indexes.by_value.values().map(Vec::len).sum();
        if value_entries != indexes.by_key.len() || indexes.by_expiry.len() != indexes.by_key.len()
        {
            return false;
        }

        indexes.by_key.iter().all(|(key, record)| {
            record.key == *key
                && indexes.by_expiry.contains(record.expiry, key)
                && indexes
                    .by_value
                    .get(&record.value)
                    .is_some_and(|keys| keys.contains(key))
        })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const FAR_FUTURE: u64 = 4_000_000_000;

    #[test]
    fn test_store_new() {
        let store = RegistryStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_save_and_get() {
        let store = RegistryStore::new();

        store.save("abc", "https://example.com", FAR_FUTURE).unwrap();

        assert_eq!(store.get("abc").unwrap(), "https://example.com");
        assert!(store.exists("abc"));
        assert_eq!(store.len(), 1);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = RegistryStore::new();

        let result = store.get("nonexistent");
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
        assert!(!store.exists("nonexistent"));
    }

    #[test]
    fn test_store_duplicate_key_leaves_original() {
        let store = RegistryStore::new();

        store.save("abc", "first", 100).unwrap();
        let result = store.save("abc", "second", 200);

        assert_eq!(result, Err(RegistryError::DuplicateKey("abc".to_string())));
        assert_eq!(store.record("abc").unwrap(), Record::new("abc", "first", 100));
        assert_eq!(store.find_by_value("second"), None);
        assert!(store.list_expired(150).contains(&"abc".to_string()));
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_rejects_empty_value() {
        let store = RegistryStore::new();

        let result = store.save("abc", "", FAR_FUTURE);
        assert!(matches!(result, Err(RegistryError::InvalidValue(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_rejects_zero_expiry() {
        let store = RegistryStore::new();

        let result = store.save("abc", "value", 0);
        assert!(matches!(result, Err(RegistryError::InvalidValue(_))));
        assert!(store.is_empty());
        assert!(store.list_expired(FAR_FUTURE).is_empty());

        store.save("abc", "value", 1).unwrap();
        assert_eq!(store.get("abc").unwrap(), "value");
    }

    #[test]
    fn test_store_remove() {
        let store = RegistryStore::new();

        store.save("abc", "value", 100).unwrap();
        let removed = store.remove("abc");

        assert_eq!(removed, Some(Record::new("abc", "value", 100)));
        assert!(store.is_empty());
        assert!(matches!(store.get("abc"), Err(RegistryError::NotFound(_))));
        assert_eq!(store.find_by_value("value"), None);
        assert!(store.list_expired(u64::MAX).is_empty());
    }

    #[test]
    fn test_store_remove_nonexistent_is_noop() {
        let store = RegistryStore::new();

        store.save("abc", "value", 100).unwrap();

        assert_eq!(store.remove("nonexistent"), None);
        assert_eq!(store.len(), 1);
        // Double removal is also harmless
        assert!(store.remove("abc").is_some());
        assert!(store.remove("abc").is_none());
    }

    #[test]
    fn test_store_find_by_value() {
        let store = RegistryStore::new();

        store.save("a1", "shared", FAR_FUTURE).unwrap();
        store.save("b2", "shared", FAR_FUTURE).unwrap();
        store.save("c3", "other", FAR_FUTURE).unwrap();

        // Most recent live record wins
        assert_eq!(store.find_by_value("shared"), Some("b2".to_string()));
        assert_eq!(store.find_by_value("missing"), None);

        // Removing the newest falls back to the older live record
        store.remove("b2");
        assert_eq!(store.find_by_value("shared"), Some("a1".to_string()));

        store.remove("a1");
        assert_eq!(store.find_by_value("shared"), None);
        assert!(store.is_consistent());
    }

    #[test]
    fn test_store_list_expired() {
        let store = RegistryStore::new();

        store.save("k1", "v1", 10).unwrap();
        store.save("k2", "v2", 20).unwrap();
        store.save("k3", "v3", 20).unwrap();
        store.save("k4", "v4", 30).unwrap();

        let mut expired = store.list_expired(20);
        expired.sort();

        assert_eq!(expired, vec!["k1", "k2", "k3"]);
        assert!(store.list_expired(9).is_empty());
    }

    #[test]
    fn test_store_remove_expired() {
        let store = RegistryStore::new();

        store.save("old", "v1", 10).unwrap();
        store.save("new", "v2", 50).unwrap();

        assert!(store.remove_expired("old", 10).is_some());
        assert!(store.remove_expired("new", 10).is_none());
        assert!(store.remove_expired("missing", 10).is_none());

        assert!(store.exists("new"));
        assert!(!store.exists("old"));
    }

    #[test]
    fn test_store_remove_expired_skips_recreated_key() {
        let store = RegistryStore::new();

        store.save("k", "v", 10).unwrap();
        let listed = store.list_expired(10);

        // Deleted and re-created between the listing and the eviction
        store.remove("k");
        store.save("k", "v", 100).unwrap();

        for key in listed {
            assert!(store.remove_expired(&key, 10).is_none());
        }
        assert_eq!(store.get("k").unwrap(), "v");
    }

    #[test]
    fn test_parallel_distinct_saves() {
        let store = Arc::new(RegistryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.save(&format!("key{}", i), &format!("v{}", i), FAR_FUTURE))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        assert_eq!(store.len(), 16);
        for i in 0..16 {
            assert_eq!(store.get(&format!("key{}", i)).unwrap(), format!("v{}", i));
        }
        assert!(store.is_consistent());
    }

    #[test]
    fn test_parallel_same_key_saves() {
        let store = Arc::new(RegistryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.save("contested", &format!("v{}", i), FAR_FUTURE))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::DuplicateKey(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(duplicates, 15);
        assert_eq!(store.len(), 1);
        assert!(store.is_consistent());
    }
}
