//! Drains the offline queue to the remote endpoint.
//!
//! One drain at a time: a second caller gets [`TrackerError::DrainInProgress`]
//! instead of waiting. Items are sent sequentially, oldest first, each under
//! its own timeout; a failed item stays pending and the drain moves on.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityProbe;
use crate::error::{OptionExt, Result, TrackerError};
use crate::providers::{AuthProvider, Credentials};
use crate::queue::OfflineQueueStore;
use crate::remote::{LocationRemote, LocationUpdate};
use crate::types::{LocationSample, SyncResult};

/// Clears the in-progress flag when the drain finishes, is cancelled, or
/// panics.
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    queue: OfflineQueueStore,
    remote: Arc<dyn LocationRemote>,
    auth: Arc<dyn AuthProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
    config: SyncConfig,
    in_progress: AtomicBool,
    last_result: Mutex<Option<SyncResult>>,
}

impl SyncEngine {
    pub fn new(
        queue: OfflineQueueStore,
        remote: Arc<dyn LocationRemote>,
        auth: Arc<dyn AuthProvider>,
        connectivity: Arc<dyn ConnectivityProbe>,
        config: SyncConfig,
    ) -> Self {
        Self {
            queue,
            remote,
            auth,
            connectivity,
            config,
            in_progress: AtomicBool::new(false),
            last_result: Mutex::new(None),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Result of the most recent drain that reached the network phase.
    pub fn last_result(&self) -> Option<SyncResult> {
        *self.last_result.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_begin(&self) -> Option<DrainGuard<'_>> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard {
                flag: &self.in_progress,
            })
    }

    /// Deliver every pending sample.
    pub async fn drain(&self) -> Result<SyncResult> {
        let Some(_guard) = self.try_begin() else {
            debug!("[SyncEngine] Drain already running, skipping");
            return Err(TrackerError::DrainInProgress);
        };

        if !self.connectivity.is_online() {
            debug!("[SyncEngine] No internet connection, skipping sync");
            return Err(TrackerError::Offline);
        }

        let credentials = self.auth.credentials().ok_or_auth_missing().inspect_err(|_| {
            warn!("[SyncEngine] No auth token or user id, skipping sync");
        })?;

        let pending = self.queue.pending();
        if pending.is_empty() {
            return Ok(SyncResult::default());
        }

        info!("[SyncEngine] Syncing {} offline locations", pending.len());
        let mut result = SyncResult {
            total_pending: pending.len() as u32,
            ..SyncResult::default()
        };

        let delay = self.config.inter_request_delay();
        for (i, sample) in pending.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.deliver(sample, &credentials).await {
                Ok(()) => match self.queue.mark_synced(&sample.id) {
                    Ok(_) => result.synced_count += 1,
                    Err(e) => {
                        // Delivered but not recorded; it will be resent.
                        warn!("[SyncEngine] Could not mark {} synced: {}", sample.id, e);
                        result.failed_count += 1;
                    }
                },
                Err(e) => {
                    warn!("[SyncEngine] Failed to sync {}: {}", sample.id, e);
                    result.failed_count += 1;
                }
            }
        }

        if let Err(e) = self.queue.prune(self.config.retention()) {
            warn!("[SyncEngine] Cleanup after sync failed: {}", e);
        }

        info!(
            "[SyncEngine] Synced {}/{} locations ({} failed)",
            result.synced_count, result.total_pending, result.failed_count
        );
        *self.last_result.lock().unwrap_or_else(|e| e.into_inner()) = Some(result);
        Ok(result)
    }

    async fn deliver(&self, sample: &LocationSample, credentials: &Credentials) -> Result<()> {
        let update = LocationUpdate::from_sample(sample, credentials, true);
        let timeout = self.config.request_timeout();
        match tokio::time::timeout(timeout, self.remote.post_location(&credentials.token, &update))
            .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(TrackerError::Timeout {
                after_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Start a drain in the background; the outcome is only logged.
    ///
    /// Does nothing outside a tokio runtime.
    pub fn spawn_drain(self: &Arc<Self>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("[SyncEngine] No runtime available, drain deferred");
            return;
        };
        let engine = Arc::clone(self);
        handle.spawn(async move {
            match engine.drain().await {
                Ok(result) if result.total_pending > 0 => {
                    debug!("[SyncEngine] Background drain finished: {:?}", result)
                }
                Ok(_) => {}
                Err(e) => debug!("[SyncEngine] Background drain skipped: {}", e),
            }
        });
    }
}
