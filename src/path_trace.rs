//! # Path Trace
//!
//! Bounded FIFO of recent positions used to draw the user's path. Never
//! synced; independent of queue state.

use serde::Deserialize;
use serde_json::Value;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::storage::{keys, Record, SharedStore};
use crate::types::PathPoint;

/// Default number of points retained (about 5-6 hours at 10 s cadence).
pub const DEFAULT_PATH_CAPACITY: usize = 1000;

impl Record for Vec<PathPoint> {
    fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        struct LegacyPoint {
            latitude: f64,
            longitude: f64,
            timestamp: DateTime<Utc>,
        }

        let legacy: Vec<LegacyPoint> = serde_json::from_value(value)?;
        Ok(legacy
            .into_iter()
            .map(|p| PathPoint::new(p.latitude, p.longitude, p.timestamp))
            .collect())
    }
}

/// Persistent bounded path trace.
#[derive(Clone)]
pub struct PathTraceStore {
    store: SharedStore,
    capacity: usize,
}

impl PathTraceStore {
    pub fn new(store: SharedStore) -> Self {
        Self::with_capacity(store, DEFAULT_PATH_CAPACITY)
    }

    pub fn with_capacity(store: SharedStore, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a point, evicting the oldest points beyond capacity.
    pub fn append(&self, point: PathPoint) -> Result<()> {
        let capacity = self.capacity;
        let evicted = self
            .store
            .update(keys::PATH_TRACE, |points: &mut Vec<PathPoint>| {
                points.push(point);
                let excess = points.len().saturating_sub(capacity);
                if excess > 0 {
                    points.drain(..excess);
                }
                (excess, true)
            })?;

        if evicted > 0 {
            log::trace!("[PathTrace] Evicted {} oldest points", evicted);
        }
        Ok(())
    }

    /// All points, oldest first.
    pub fn all(&self) -> Vec<PathPoint> {
        self.store.load(keys::PATH_TRACE)
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// Empty the trace (explicit user reset only).
    pub fn clear(&self) -> Result<()> {
        self.store.remove(keys::PATH_TRACE)?;
        log::info!("[PathTrace] Cleared");
        Ok(())
    }
}
