//! Expiry Index Module
//!
//! Orders live keys by expiration time for range eviction.

use std::collections::{BTreeMap, HashSet};

// == Expiry Index ==
/// Maps expiry timestamps to the keys that expire at that instant.
///
/// Backed by a BTreeMap so that "everything expiring at or before T" is a
/// range scan over the front of the map. Empty buckets are dropped eagerly.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    buckets: BTreeMap<u64, HashSet<String>>,
}

impl ExpiryIndex {
    // == Constructor ==
    /// Creates a new empty expiry index.
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Registers `key` as expiring at `expiry`.
    pub fn insert(&mut self, expiry: u64, key: &str) {
        self.buckets
            .entry(expiry)
            .or_default()
            .insert(key.to_string());
    }

    // == Remove ==
    /// Unregisters `key` from the bucket at `expiry`.
    pub fn remove(&mut self, expiry: u64, key: &str) {
        if let Some(keys) = self.buckets.get_mut(&expiry) {
            keys.remove(key);
            if keys.is_empty() {
                self.buckets.remove(&expiry);
            }
        }
    }

    // == Expired As Of ==
    /// Returns every key with expiry <= `now`.
    pub fn expired_as_of(&self, now: u64) -> Vec<String> {
        self.buckets
            .range(..=now)
            .flat_map(|(_, keys)| keys.iter().cloned())
            .collect()
    }

    // == Length ==
    /// Returns the number of tracked keys across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(HashSet::len).sum()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    // == Contains ==
    /// Checks if `key` is tracked at `expiry`.
    pub fn contains(&self, expiry: u64, key: &str) -> bool {
        self.buckets
            .get(&expiry)
            .is_some_and(|keys| keys.contains(key))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut keys: Vec<String>) -> Vec<String> {
        keys.sort();
        keys
    }

    #[test]
    fn test_index_new() {
        let index = ExpiryIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_expired_as_of_is_inclusive() {
        let mut index = ExpiryIndex::new();

        index.insert(10, "a");
        index.insert(20, "b");
        index.insert(30, "c");

        assert!(index.expired_as_of(9).is_empty());
        assert_eq!(index.expired_as_of(20), vec!["a", "b"]);
        assert_eq!(index.expired_as_of(u64::MAX).len(), 3);
    }

    #[test]
    fn test_shared_bucket() {
        let mut index = ExpiryIndex::new();

        index.insert(10, "a");
        index.insert(10, "b");

        assert_eq!(index.len(), 2);
        assert_eq!(sorted(index.expired_as_of(10)), vec!["a", "b"]);

        index.remove(10, "a");
        assert_eq!(index.expired_as_of(10), vec!["b"]);
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let mut index = ExpiryIndex::new();

        index.insert(10, "a");
        index.remove(10, "a");

        assert!(index.is_empty());
        assert!(!index.contains(10, "a"));
    }

    #[test]
    fn test_remove_nonexistent_key() {
        let mut index = ExpiryIndex::new();

        index.insert(10, "a");

        // Wrong bucket and unknown key are both no-ops
        index.remove(11, "a");
        index.remove(10, "zzz");

        assert_eq!(index.len(), 1);
        assert!(index.contains(10, "a"));
    }
}
