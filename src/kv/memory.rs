//! In-memory KV store implementation using `DashMap`.
//!
//! This is the default backend - data is lost on process restart.
//! For persistence, use `SqliteKvStore`.

use super::KvStore;
use crate::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// In-memory key-value store using lock-free concurrent hashmap.
///
/// Thread-safe and optimized for high-concurrency read/write workloads.
/// `compare_and_swap` holds the shard lock for the key through the
/// entry API, so it is atomic per key without a global lock.
///
/// # Example
///
/// ```rust
/// use variant_db::kv::{KvStore, MemoryKvStore};
///
/// let store = MemoryKvStore::new();
/// store.set("hello", b"world".to_vec())?;
/// assert_eq!(store.get("hello")?, Some(b"world".to_vec()));
/// # Ok::<(), variant_db::Error>(())
/// ```
#[derive(Debug)]
pub struct MemoryKvStore {
    store: DashMap<String, Vec<u8>>,
}

impl MemoryKvStore {
    /// Create a new in-memory KV store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            store: DashMap::with_capacity(capacity),
        }
    }

    /// Get the number of entries in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.store.clear();
    }
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.store.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.store.contains_key(key))
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&[u8]>, new: Vec<u8>) -> Result<bool> {
        match self.store.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if expected == Some(entry.get().as_slice()) {
                    entry.insert(new);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(entry) => {
                if expected.is_none() {
                    entry.insert(new);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_kv_with_capacity() {
        let store = MemoryKvStore::with_capacity(100);
        store.set("key", b"value".to_vec()).unwrap();
        assert_eq!(store.get("key").unwrap(), Some(b"value".to_vec()));
    }

    #[test]
    fn test_memory_kv_len_and_clear() {
        let store = MemoryKvStore::default();
        assert!(store.is_empty());

        store.set("key1", b"value1".to_vec()).unwrap();
        store.set("key2", b"value2".to_vec()).unwrap();
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.get("key1").unwrap(), None);
    }
}
