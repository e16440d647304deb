//! SQLite-backed durable store.
//!
//! One `kv` table holds every key. Blobs are the versioned JSON envelopes
//! produced by [`super::codec`]; SQLite only sees opaque bytes.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::DurableStore;
use crate::error::{Result, TrackerError};

impl From<rusqlite::Error> for TrackerError {
    fn from(e: rusqlite::Error) -> Self {
        TrackerError::storage(e)
    }
}

/// Durable store persisted in a SQLite database file.
pub struct SqliteStore {
    db: Mutex<Connection>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the store at the given database path.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        log::info!("[SqliteStore] Opened {}", db_path);

        Ok(Self {
            db: Mutex::new(db),
            db_path: db_path.to_string(),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of stored keys.
    pub fn key_count(&self) -> Result<u32> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(count as u32)
    }
}

impl DurableStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let blob = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(blob)
    }

    fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at)
             VALUES (?, ?, strftime('%s', 'now'))",
            params![key, blob],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM kv WHERE key = ?", params![key])?;
        Ok(())
    }
}
