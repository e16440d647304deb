//! # Durable Store
//!
//! Key/blob persistence shared by every component. The store owns no policy:
//! the queue, path trace, session gate and settings each own their own keys
//! and go through [`SharedStore`], which serializes read-modify-write cycles
//! behind a single lock.
//!
//! Backends:
//! - [`MemoryStore`] for tests and ephemeral use
//! - [`SqliteStore`] (feature `persistence`) for on-device storage

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TrackerError};

pub mod codec;
pub use codec::{Record, SCHEMA_VERSION};

#[cfg(feature = "persistence")]
pub mod sqlite;
#[cfg(feature = "persistence")]
pub use sqlite::SqliteStore;

/// Keys owned by each component.
pub mod keys {
    pub const OFFLINE_QUEUE: &str = "offline_locations";
    pub const PATH_TRACE: &str = "user_path_history";
    pub const CURRENT_SESSION: &str = "current_group";
    pub const SESSION_HISTORY: &str = "group_history";
    pub const SETTINGS: &str = "location_settings";
}

/// Pluggable key/blob persistence.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, blob: &[u8]) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store backed by a HashMap.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, blob: &[u8]) -> Result<()> {
        self.entries().insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// A durable store plus the write lock every mutating component shares.
///
/// Each mutation rewrites a whole collection, so two unserialized writers
/// would lose updates. All `update`/`remove` calls hold the lock for the
/// full read-modify-write.
#[derive(Clone)]
pub struct SharedStore {
    backend: Arc<dyn DurableStore>,
    write_lock: Arc<Mutex<()>>,
}

impl SharedStore {
    pub fn new(backend: Arc<dyn DurableStore>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// In-memory store (for testing).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state.
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read and decode a key, propagating failures.
    pub fn try_load<T: Record>(&self, key: &str) -> Result<T> {
        match self.backend.get(key)? {
            Some(blob) => codec::decode(key, &blob),
            None => Ok(T::default()),
        }
    }

    /// Read a key, falling back to the default value on any failure.
    pub fn load<T: Record>(&self, key: &str) -> T {
        self.try_load(key).unwrap_or_else(|e| {
            log::warn!("[Storage] Failed to read '{}': {}", key, e);
            T::default()
        })
    }

    /// Delete a key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock();
        self.backend.remove(key)
    }

    /// Serialized read-modify-write.
    ///
    /// `mutate` returns its result and whether the value changed; unchanged
    /// values are not written back. An undecodable blob is copied to
    /// `<key>.corrupt` and replaced by the default before mutating. Nothing
    /// is written if encoding fails.
    pub fn update<T, R, F>(&self, key: &str, mutate: F) -> Result<R>
    where
        T: Record,
        F: FnOnce(&mut T) -> (R, bool),
    {
        let _guard = self.lock();

        let mut value = match self.backend.get(key)? {
            Some(blob) => match codec::decode::<T>(key, &blob) {
                Ok(value) => value,
                Err(e @ (TrackerError::Codec { .. } | TrackerError::UnsupportedSchema { .. })) => {
                    log::error!(
                        "[Storage] '{}' unreadable ({}), moving it to '{}.corrupt'",
                        key,
                        e,
                        key
                    );
                    self.backend.set(&format!("{}.corrupt", key), &blob)?;
                    T::default()
                }
                Err(e) => return Err(e),
            },
            None => T::default(),
        };

        let (result, changed) = mutate(&mut value);
        if changed {
            let blob = codec::encode(key, &value)?;
            self.backend.set(key, &blob)?;
        }
        Ok(result)
    }
}
