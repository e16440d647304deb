//! The host-facing facade.
//!
//! A [`Tracker`] owns one instance of every component, all sharing a single
//! [`SharedStore`], and exposes the operations a map screen needs.

use std::sync::Arc;

use log::info;

use crate::capture::{BackgroundFeed, CaptureScheduler, IngestOutcome, IngestPipeline};
use crate::config::TrackerConfig;
use crate::connectivity::{ConnectivityMonitor, Reachability};
use crate::error::Result;
use crate::nearby::NearbyMembers;
use crate::path_trace::PathTraceStore;
use crate::providers::{CredentialStore, Credentials, PositionProvider};
use crate::queue::OfflineQueueStore;
use crate::remote::LocationRemote;
use crate::session::SessionGate;
use crate::settings::{SettingsPatch, SettingsStore};
use crate::stats::StatsAggregator;
use crate::storage::{DurableStore, SharedStore};
use crate::sync::SyncEngine;
use crate::types::{
    AppState, CaptureSource, Fix, LocationSettings, NearbyMember, OfflineStats, PathPoint,
    SessionContext, SyncResult,
};

/// Background tasks started by [`Tracker::start_background_tasks`].
///
/// Every task is aborted when this is dropped.
pub struct TrackerTasks {
    feed: BackgroundFeed,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl TrackerTasks {
    /// Where the platform's background location callback delivers fixes.
    pub fn background_feed(&self) -> &BackgroundFeed {
        &self.feed
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl Drop for TrackerTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

pub struct Tracker {
    config: TrackerConfig,
    queue: OfflineQueueStore,
    path: PathTraceStore,
    gate: SessionGate,
    settings: SettingsStore,
    stats: StatsAggregator,
    credentials: CredentialStore,
    reachability: Reachability,
    pipeline: IngestPipeline,
    engine: Arc<SyncEngine>,
    nearby: Arc<NearbyMembers>,
    scheduler: Arc<CaptureScheduler>,
}

impl Tracker {
    /// Wire every component over `backend`.
    ///
    /// Starts offline and logged out; the host reports both via
    /// [`Tracker::set_online`] and [`Tracker::set_credentials`].
    pub fn new(
        config: TrackerConfig,
        backend: Arc<dyn DurableStore>,
        remote: Arc<dyn LocationRemote>,
        position: Arc<dyn PositionProvider>,
    ) -> Self {
        let store = SharedStore::new(backend);
        let queue = OfflineQueueStore::new(store.clone());
        let path = PathTraceStore::with_capacity(store.clone(), config.capture.path_capacity);
        let gate = SessionGate::with_history_capacity(store.clone(), config.capture.history_capacity);
        let settings = SettingsStore::new(store);
        let stats = StatsAggregator::new(queue.clone(), path.clone(), settings.clone());
        let credentials = CredentialStore::new();
        let reachability = Reachability::new(false);

        let engine = Arc::new(SyncEngine::new(
            queue.clone(),
            remote.clone(),
            Arc::new(credentials.clone()),
            Arc::new(reachability.clone()),
            config.sync.clone(),
        ));
        let nearby = Arc::new(NearbyMembers::new(
            gate.clone(),
            remote,
            Arc::new(credentials.clone()),
            Arc::new(reachability.clone()),
            config.sync.request_timeout(),
        ));
        let pipeline = IngestPipeline::new(
            settings.clone(),
            gate.clone(),
            queue.clone(),
            path.clone(),
            engine.clone(),
        );
        let scheduler = Arc::new(CaptureScheduler::new(
            pipeline.clone(),
            position,
            engine.clone(),
            nearby.clone(),
            config.capture.clone(),
            config.sync.periodic_interval(),
        ));

        Self {
            config,
            queue,
            path,
            gate,
            settings,
            stats,
            credentials,
            reachability,
            pipeline,
            engine,
            nearby,
            scheduler,
        }
    }

    /// Tracker talking to `config.sync.base_url` over HTTP.
    #[cfg(feature = "http")]
    pub fn with_http(
        config: TrackerConfig,
        backend: Arc<dyn DurableStore>,
        position: Arc<dyn PositionProvider>,
    ) -> Result<Self> {
        let remote = crate::http::HttpRemote::new(&config.sync.base_url, config.sync.request_timeout())?;
        Ok(Self::new(config, backend, Arc::new(remote), position))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // Platform inputs

    pub fn set_credentials(&self, credentials: Option<Credentials>) {
        self.credentials.set(credentials);
    }

    pub fn set_online(&self, online: bool) {
        self.reachability.set_online(online);
    }

    pub fn reachability(&self) -> &Reachability {
        &self.reachability
    }

    pub fn set_app_state(&self, state: AppState) {
        self.scheduler.set_app_state(state);
    }

    pub fn app_state(&self) -> AppState {
        self.scheduler.app_state()
    }

    // Capture and sync

    pub fn ingest(&self, fix: &Fix, source: CaptureSource) -> Result<IngestOutcome> {
        self.pipeline.ingest(fix, source)
    }

    /// Manual capture; positioning errors, including permission denial,
    /// are returned to the caller.
    pub async fn capture_now(&self) -> Result<IngestOutcome> {
        self.scheduler.capture_now().await
    }

    pub async fn sync_now(&self) -> Result<SyncResult> {
        self.engine.drain().await
    }

    pub fn is_syncing(&self) -> bool {
        self.engine.is_draining()
    }

    pub fn last_sync_result(&self) -> Option<SyncResult> {
        self.engine.last_result()
    }

    pub fn stats(&self) -> OfflineStats {
        self.stats.snapshot()
    }

    pub fn path(&self) -> Vec<PathPoint> {
        self.path.all()
    }

    pub fn clear_path(&self) -> Result<()> {
        self.path.clear()
    }

    // Sessions

    pub fn start_session(&self, group_id: &str) -> Result<SessionContext> {
        let session = self.gate.start_session(group_id)?;
        info!("[Tracker] Joined group {}", group_id);
        Ok(session)
    }

    pub fn end_session(&self) -> Result<Option<SessionContext>> {
        let ended = self.gate.end_session()?;
        self.nearby.clear();
        Ok(ended)
    }

    pub fn current_session(&self) -> Option<SessionContext> {
        self.gate.current()
    }

    pub fn session_history(&self) -> Vec<SessionContext> {
        self.gate.history()
    }

    // Settings

    pub fn settings(&self) -> LocationSettings {
        self.settings.get()
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> Result<LocationSettings> {
        self.settings.update(patch)
    }

    // Nearby members

    pub async fn nearby_members(&self) -> Result<Vec<NearbyMember>> {
        self.nearby.refresh().await
    }

    pub fn cached_nearby_members(&self) -> Vec<NearbyMember> {
        self.nearby.latest()
    }

    /// Forget everything tied to the signed-in user: queue, path, current
    /// session and credentials. Session history and settings are kept.
    pub fn logout(&self) -> Result<()> {
        self.queue.clear()?;
        self.path.clear()?;
        self.gate.clear_current()?;
        self.credentials.set(None);
        self.nearby.clear();
        info!("[Tracker] Local tracking data cleared");
        Ok(())
    }

    /// Spawn the capture triggers and the connectivity monitor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_background_tasks(&self) -> TrackerTasks {
        let scheduled = self.scheduler.start();
        let mut handles = scheduled.handles;
        handles.push(ConnectivityMonitor::spawn(
            &self.reachability,
            self.engine.clone(),
            Some(self.nearby.clone()),
            self.config.sync.connectivity_debounce(),
        ));
        info!("[Tracker] Started {} background tasks", handles.len());
        TrackerTasks {
            feed: scheduled.feed,
            handles,
        }
    }
}
