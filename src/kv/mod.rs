//! Key-Value Store Module
//!
//! Byte-level persistence underneath the assignment store:
//! - In-memory backend (`DashMap`) for servers and tests
//! - SQLite-backed backend for durable single-node deployments
//! - Atomic per-key compare-and-swap so create-if-absent is race-free
//!
//! # Example
//!
//! ```rust
//! use variant_db::kv::{KvStore, MemoryKvStore};
//!
//! # fn example() -> variant_db::Result<()> {
//! let store = MemoryKvStore::new();
//!
//! // Basic operations
//! store.set("key", b"value".to_vec())?;
//! assert_eq!(store.get("key")?, Some(b"value".to_vec()));
//!
//! // Only swaps when the current value matches
//! assert!(!store.compare_and_swap("key", None, b"other".to_vec())?);
//! assert!(store.compare_and_swap("key", Some(b"value"), b"other".to_vec())?);
//!
//! store.delete("key")?;
//! assert!(!store.exists("key")?);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use crate::Result;

/// Key-value store trait backing the assignment store.
///
/// Implementations must make `compare_and_swap` atomic per key; reads may
/// run concurrently with each other and with writes to other keys.
pub trait KvStore: Send + Sync {
    /// Get a value by key.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium is unavailable.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value for a key.
    ///
    /// Overwrites any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium is unavailable.
    fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Delete a key.
    ///
    /// No-op if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium is unavailable.
    fn delete(&self, key: &str) -> Result<()>;

    /// Replace the value at `key` with `new` only if the current value
    /// equals `expected` (`None` meaning "key absent").
    ///
    /// Returns `true` if the swap happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium is unavailable.
    fn compare_and_swap(&self, key: &str, expected: Option<&[u8]>, new: Vec<u8>) -> Result<bool>;

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium is unavailable.
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Get multiple keys in a batch.
    ///
    /// Returns values in the same order as keys. Missing keys return `None`.
    ///
    /// # Errors
    ///
    /// Returns the first backend error encountered.
    fn batch_get(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }
}

impl<T: KvStore + ?Sized> KvStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&[u8]>, new: Vec<u8>) -> Result<bool> {
        (**self).compare_and_swap(key, expected, new)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
}
