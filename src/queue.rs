//! # Offline Queue
//!
//! Durable, ordered collection of captured samples. Insertion order is sync
//! priority. This is the only component allowed to flip `synced`, and it
//! only ever flips it from false to true.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;
use ulid::{Generator, Ulid};

use crate::error::Result;
use crate::storage::{keys, Record, SharedStore};
use crate::types::{CaptureSource, LocationSample, NewSample};

impl Record for Vec<LocationSample> {
    fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
        let legacy: Vec<LegacySample> = serde_json::from_value(value)?;
        Ok(legacy.into_iter().map(LegacySample::into_sample).collect())
    }
}

/// Queue entry as written by the first app release.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySample {
    id: Value,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    is_background: bool,
    #[serde(default)]
    synced: bool,
}

impl LegacySample {
    fn into_sample(self) -> LocationSample {
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        LocationSample {
            id: format!("legacy-{}", id),
            latitude: self.latitude,
            longitude: self.longitude,
            captured_at: self.timestamp,
            capture_source: if self.is_background {
                CaptureSource::Background
            } else {
                CaptureSource::Foreground
            },
            synced: self.synced,
            group_id: None,
            session_id: None,
        }
    }
}

/// Persistent queue of location samples.
#[derive(Clone)]
pub struct OfflineQueueStore {
    store: SharedStore,
    ids: Arc<Mutex<Generator>>,
}

impl OfflineQueueStore {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            ids: Arc::new(Mutex::new(Generator::new())),
        }
    }

    /// Millisecond timestamp plus random tiebreaker, strictly increasing
    /// within one process.
    fn next_id(&self) -> String {
        let mut generator = self.ids.lock().unwrap_or_else(|e| e.into_inner());
        generator
            .generate()
            .unwrap_or_else(|_| Ulid::new())
            .to_string()
    }

    /// Append a new unsynced sample and persist the whole sequence.
    pub fn append(&self, new: NewSample) -> Result<LocationSample> {
        let sample = LocationSample {
            id: self.next_id(),
            latitude: new.latitude,
            longitude: new.longitude,
            captured_at: new.captured_at,
            capture_source: new.capture_source,
            synced: false,
            group_id: new.group_id,
            session_id: new.session_id,
        };

        let len = self
            .store
            .update(keys::OFFLINE_QUEUE, |samples: &mut Vec<LocationSample>| {
                samples.push(sample.clone());
                (samples.len(), true)
            })?;

        log::debug!(
            "[OfflineQueue] Saved {} ({:?}), queue length {}",
            sample.id,
            sample.capture_source,
            len
        );
        Ok(sample)
    }

    /// Every sample, oldest first.
    pub fn all(&self) -> Vec<LocationSample> {
        self.store.load(keys::OFFLINE_QUEUE)
    }

    /// Unsynced samples, oldest first.
    pub fn pending(&self) -> Vec<LocationSample> {
        let mut samples = self.all();
        samples.retain(|s| !s.synced);
        samples
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.all().is_empty()
    }

    /// Mark a sample as delivered.
    ///
    /// Returns false (and writes nothing) when the id is unknown, already
    /// pruned, or already synced.
    pub fn mark_synced(&self, id: &str) -> Result<bool> {
        self.store
            .update(keys::OFFLINE_QUEUE, |samples: &mut Vec<LocationSample>| {
                match samples.iter_mut().find(|s| s.id == id) {
                    Some(sample) if !sample.synced => {
                        sample.synced = true;
                        (true, true)
                    }
                    _ => (false, false),
                }
            })
    }

    /// Remove synced samples older than the retention window.
    pub fn prune(&self, retention: Duration) -> Result<usize> {
        self.prune_at(retention, Utc::now())
    }

    /// Remove synced samples captured more than `retention` before `now`.
    /// Unsynced samples are kept regardless of age.
    pub fn prune_at(&self, retention: Duration, now: DateTime<Utc>) -> Result<usize> {
        let window = TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX);
        let Some(cutoff) = now.checked_sub_signed(window) else {
            return Ok(0);
        };

        let removed = self
            .store
            .update(keys::OFFLINE_QUEUE, |samples: &mut Vec<LocationSample>| {
                let before = samples.len();
                samples.retain(|s| !s.synced || s.captured_at >= cutoff);
                let removed = before - samples.len();
                (removed, removed > 0)
            })?;

        if removed > 0 {
            log::info!("[OfflineQueue] Cleaned up {} old locations", removed);
        }
        Ok(removed)
    }

    /// Drop every sample (logout reset).
    pub fn clear(&self) -> Result<()> {
        self.store.remove(keys::OFFLINE_QUEUE)
    }
}
