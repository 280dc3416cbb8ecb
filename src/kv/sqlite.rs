//! SQLite-backed KV store.
//!
//! A single `kv(key TEXT PRIMARY KEY, value BLOB)` table in one database
//! file. Keys are stored verbatim, so key length is bounded only by
//! SQLite's row size. File databases run in WAL mode with
//! `synchronous = FULL`: a write is on disk once the statement returns.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::KvStore;
use crate::{Error, Result};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
);";

/// Durable key-value store in a single SQLite file.
///
/// # Example
///
/// ```rust,no_run
/// use variant_db::kv::{KvStore, SqliteKvStore};
///
/// let store = SqliteKvStore::open("/var/lib/variant-db/assignments.db")?;
/// store.set("hello", b"world".to_vec())?;
/// # Ok::<(), variant_db::Error>(())
/// ```
#[derive(Debug)]
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (creating if needed) the database file at `path`.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = FULL;")?;
        Self::init(conn)
    }

    /// Open a private in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StorageError("SqliteKvStore connection lock poisoned".to_string()))
    }
}

impl KvStore for SqliteKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn compare_and_swap(&self, key: &str, expected: Option<&[u8]>, new: Vec<u8>) -> Result<bool> {
        let conn = self.conn()?;
        let changed = match expected {
            None => conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING",
                params![key, new],
            )?,
            Some(current) => conn.execute(
                "UPDATE kv SET value = ?2 WHERE key = ?1 AND value = ?3",
                params![key, new, current],
            )?,
        };
        Ok(changed == 1)
    }
}
