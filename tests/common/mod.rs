//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use trailsync::{
    CaptureSource, CredentialStore, Credentials, LocationRemote, LocationUpdate, NearbyMember,
    NewSample, OfflineQueueStore, Reachability, SharedStore, SyncConfig, SyncEngine, TrackerError,
};

pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Remote answering each POST with the next scripted status (200 once the
/// script runs out).
#[derive(Default)]
pub struct ScriptedRemote {
    statuses: Mutex<VecDeque<u16>>,
    latency: Duration,
    posted: Mutex<Vec<LocationUpdate>>,
}

impl ScriptedRemote {
    pub fn new(statuses: &[u16]) -> Self {
        Self {
            statuses: Mutex::new(statuses.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn posted(&self) -> Vec<LocationUpdate> {
        self.posted.lock().unwrap().clone()
    }

    pub fn post_count(&self) -> usize {
        self.posted.lock().unwrap().len()
    }
}

impl LocationRemote for ScriptedRemote {
    fn post_location<'a>(
        &'a self,
        _token: &'a str,
        update: &'a LocationUpdate,
    ) -> BoxFuture<'a, trailsync::Result<()>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.posted.lock().unwrap().push(update.clone());
            let status = self.statuses.lock().unwrap().pop_front().unwrap_or(200);
            if (200..300).contains(&status) {
                Ok(())
            } else {
                Err(TrackerError::RemoteRejected { status })
            }
        })
    }

    fn nearby_members<'a>(
        &'a self,
        _token: &'a str,
        _group_id: &'a str,
    ) -> BoxFuture<'a, trailsync::Result<Vec<NearbyMember>>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

pub struct SyncFixture {
    pub store: SharedStore,
    pub queue: OfflineQueueStore,
    pub remote: Arc<ScriptedRemote>,
    pub reachability: Reachability,
    pub engine: Arc<SyncEngine>,
}

pub fn sync_fixture(remote: ScriptedRemote) -> SyncFixture {
    let store = SharedStore::in_memory();
    let queue = OfflineQueueStore::new(store.clone());
    let remote = Arc::new(remote);
    let reachability = Reachability::new(true);
    let engine = Arc::new(SyncEngine::new(
        queue.clone(),
        remote.clone(),
        Arc::new(CredentialStore::with(Credentials::new("token", 7))),
        Arc::new(reachability.clone()),
        SyncConfig {
            inter_request_delay_ms: 1,
            request_timeout_ms: 500,
            ..SyncConfig::default()
        },
    ));
    SyncFixture {
        store,
        queue,
        remote,
        reachability,
        engine,
    }
}

pub fn sample_at(latitude: f64, captured_at: DateTime<Utc>) -> NewSample {
    NewSample {
        latitude,
        longitude: 25.2797,
        captured_at,
        capture_source: CaptureSource::Foreground,
        group_id: Some("12".to_string()),
        session_id: Some("01JSESSION".to_string()),
    }
}
