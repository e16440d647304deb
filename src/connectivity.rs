//! Network reachability and the reconnect-triggered drain.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::nearby::NearbyMembers;
use crate::sync::SyncEngine;

/// Point-in-time reachability check.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Latest reachability as reported by the platform, broadcast to watchers.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct Reachability {
    tx: Arc<watch::Sender<bool>>,
}

impl Reachability {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Record a platform connectivity report. Repeats are ignored.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    /// Receiver that wakes on every online/offline change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl ConnectivityProbe for Reachability {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Drains the queue when connectivity comes back.
pub struct ConnectivityMonitor;

impl ConnectivityMonitor {
    /// Watch `reachability` until every handle to it is dropped.
    ///
    /// On offline to online: wait `debounce`, and if still online run one
    /// drain followed by a nearby-members refresh.
    pub fn spawn(
        reachability: &Reachability,
        engine: Arc<SyncEngine>,
        nearby: Option<Arc<NearbyMembers>>,
        debounce: Duration,
    ) -> JoinHandle<()> {
        // Baseline is taken here so a change reported right after spawn
        // is seen as a transition
        let mut rx = reachability.subscribe();
        let mut online = *rx.borrow_and_update();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let now_online = *rx.borrow_and_update();
                if now_online == online {
                    continue;
                }
                online = now_online;

                if !online {
                    info!("[Connectivity] Connection lost, switching to offline mode");
                    continue;
                }

                info!("[Connectivity] Connection restored");
                tokio::time::sleep(debounce).await;
                if !*rx.borrow_and_update() {
                    debug!("[Connectivity] Went offline again during debounce");
                    online = false;
                    continue;
                }

                match engine.drain().await {
                    Ok(result) => info!(
                        "[Connectivity] Reconnect sync: {} synced, {} failed",
                        result.synced_count, result.failed_count
                    ),
                    Err(e) => warn!("[Connectivity] Reconnect sync skipped: {}", e),
                }
                if let Some(nearby) = &nearby {
                    nearby.refresh_quietly().await;
                }
            }
            debug!("[Connectivity] Reachability source closed, monitor stopping");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    use crate::config::SyncConfig;
    use crate::providers::{CredentialStore, Credentials};
    use crate::queue::OfflineQueueStore;
    use crate::storage::SharedStore;
    use crate::test_support::FakeRemote;
    use crate::types::{CaptureSource, NewSample};

    fn setup(reachability: &Reachability) -> (OfflineQueueStore, Arc<FakeRemote>, Arc<SyncEngine>) {
        let queue = OfflineQueueStore::new(SharedStore::in_memory());
        queue
            .append(NewSample {
                latitude: 54.0,
                longitude: 25.0,
                captured_at: Utc::now(),
                capture_source: CaptureSource::Background,
                group_id: None,
                session_id: None,
            })
            .unwrap();
        let remote = Arc::new(FakeRemote::new());
        let engine = Arc::new(SyncEngine::new(
            queue.clone(),
            remote.clone(),
            Arc::new(CredentialStore::with(Credentials::new("t", 1))),
            Arc::new(reachability.clone()),
            SyncConfig {
                inter_request_delay_ms: 0,
                ..SyncConfig::default()
            },
        ));
        (queue, remote, engine)
    }

    #[test]
    fn test_repeated_reports_do_not_notify() {
        let reachability = Reachability::new(true);
        let rx = reachability.subscribe();
        reachability.set_online(true);
        assert!(!rx.has_changed().unwrap());

        reachability.set_online(false);
        assert!(rx.has_changed().unwrap());
        assert!(!reachability.is_online());
    }

    #[tokio::test]
    async fn test_reconnect_drains_once() {
        let reachability = Reachability::new(false);
        let (queue, remote, engine) = setup(&reachability);
        let handle = ConnectivityMonitor::spawn(&reachability, engine, None, Duration::from_millis(20));

        // Reported before the monitor task is first polled
        reachability.set_online(true);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(remote.call_count(), 1);
        assert!(queue.pending().is_empty());
        handle.abort();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reconnect_right_after_spawn_on_worker_pool() {
        for _ in 0..20 {
            let reachability = Reachability::new(false);
            let (queue, remote, engine) = setup(&reachability);
            let handle =
                ConnectivityMonitor::spawn(&reachability, engine, None, Duration::from_millis(5));
            reachability.set_online(true);
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(remote.call_count(), 1);
            assert!(queue.pending().is_empty());
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_flap_within_debounce_skips_drain() {
        let reachability = Reachability::new(false);
        let (queue, remote, engine) = setup(&reachability);
        let handle = ConnectivityMonitor::spawn(&reachability, engine, None, Duration::from_millis(100));

        reachability.set_online(true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        reachability.set_online(false);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(remote.call_count(), 0);
        assert_eq!(queue.pending().len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_monitor_stops_when_source_dropped() {
        let engine_view = Reachability::new(true);
        let (_queue, _remote, engine) = setup(&engine_view);
        let monitored = Reachability::new(true);
        let handle = ConnectivityMonitor::spawn(&monitored, engine, None, Duration::ZERO);

        drop(monitored);
        let finished = tokio::time::timeout(Duration::from_millis(500), handle).await;
        assert!(finished.is_ok());
    }
}
