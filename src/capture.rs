//! Turning position fixes into queued samples.
//!
//! [`IngestPipeline`] is the single write path: settings check, session gate,
//! queue, path trace, then a fire-and-forget drain. [`CaptureScheduler`] owns
//! the triggers that feed it:
//! - Foreground timer (only while the app is in the foreground)
//! - Background deliveries from the OS, thinned by [`BackgroundFilter`]
//! - Debounced app-state transitions
//! - Periodic sync and nearby-members timers

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::CaptureConfig;
use crate::error::{Result, TrackerError};
use crate::events::{self, ChannelSource, TimerSource, WatchSource};
use crate::nearby::NearbyMembers;
use crate::path_trace::PathTraceStore;
use crate::providers::PositionProvider;
use crate::queue::OfflineQueueStore;
use crate::session::SessionGate;
use crate::settings::SettingsStore;
use crate::sync::SyncEngine;
use crate::types::{AppState, CaptureSource, Fix, LocationSample, NewSample, PathPoint};

/// Pending background deliveries before new ones are dropped.
const BACKGROUND_FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    TrackingDisabled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Recorded(LocationSample),
    /// No active group session; nothing was written.
    NoActiveSession,
    Discarded(DiscardReason),
}

impl IngestOutcome {
    pub fn sample(&self) -> Option<&LocationSample> {
        match self {
            IngestOutcome::Recorded(sample) => Some(sample),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct IngestPipeline {
    settings: SettingsStore,
    gate: SessionGate,
    queue: OfflineQueueStore,
    path: PathTraceStore,
    engine: Arc<SyncEngine>,
}

impl IngestPipeline {
    pub fn new(
        settings: SettingsStore,
        gate: SessionGate,
        queue: OfflineQueueStore,
        path: PathTraceStore,
        engine: Arc<SyncEngine>,
    ) -> Self {
        Self {
            settings,
            gate,
            queue,
            path,
            engine,
        }
    }

    /// Persist `fix` if tracking is enabled and a session is active, then
    /// kick off a drain.
    pub fn ingest(&self, fix: &Fix, source: CaptureSource) -> Result<IngestOutcome> {
        if !fix.is_valid() {
            return Err(TrackerError::Positioning {
                message: format!("invalid coordinates ({}, {})", fix.latitude, fix.longitude),
            });
        }

        let settings = self.settings.get();
        if !settings.tracking_enabled {
            debug!("[Ingest] Tracking disabled, discarding fix");
            return Ok(IngestOutcome::Discarded(DiscardReason::TrackingDisabled));
        }

        let decision = self.gate.evaluate();
        if !decision.allowed {
            debug!("[Ingest] No active group, not saving location");
            return Ok(IngestOutcome::NoActiveSession);
        }

        let sample = self.queue.append(NewSample::from_fix(
            fix,
            source,
            decision.context.as_ref(),
        ))?;

        if settings.path_recording {
            if let Err(e) = self.path.append(PathPoint::from(&sample)) {
                warn!("[Ingest] Path trace not updated: {}", e);
            }
        }

        self.engine.spawn_drain();
        Ok(IngestOutcome::Recorded(sample))
    }
}

/// Thins background deliveries: the first fix is always accepted, later ones
/// need both the minimum interval and the minimum displacement since the
/// last accepted fix.
#[derive(Debug, Clone)]
pub struct BackgroundFilter {
    min_interval: Duration,
    min_displacement_m: f64,
    last_accepted: Option<Fix>,
}

impl BackgroundFilter {
    pub fn new(min_interval: Duration, min_displacement_m: f64) -> Self {
        Self {
            min_interval,
            min_displacement_m,
            last_accepted: None,
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.background_interval(), config.min_displacement_m)
    }

    pub fn accept(&mut self, fix: &Fix) -> bool {
        let accepted = match &self.last_accepted {
            None => true,
            Some(previous) => {
                let elapsed = (fix.timestamp - previous.timestamp)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                elapsed >= self.min_interval
                    && previous.distance_to(fix) >= self.min_displacement_m
            }
        };
        if accepted {
            self.last_accepted = Some(*fix);
        }
        accepted
    }
}

/// Sending half for OS background location callbacks.
#[derive(Clone)]
pub struct BackgroundFeed {
    tx: mpsc::Sender<Fix>,
}

impl BackgroundFeed {
    /// Hand over a background fix. Never blocks; returns false if the
    /// scheduler is gone or saturated.
    pub fn deliver(&self, fix: Fix) -> bool {
        match self.tx.try_send(fix) {
            Ok(()) => true,
            Err(e) => {
                warn!("[CaptureScheduler] Background fix dropped: {}", e);
                false
            }
        }
    }
}

/// Running trigger tasks plus the background feed.
pub struct SchedulerTasks {
    pub feed: BackgroundFeed,
    pub handles: Vec<JoinHandle<()>>,
}

pub struct CaptureScheduler {
    pipeline: IngestPipeline,
    position: Arc<dyn PositionProvider>,
    engine: Arc<SyncEngine>,
    nearby: Arc<NearbyMembers>,
    config: CaptureConfig,
    sync_interval: Duration,
    app_state: watch::Sender<AppState>,
}

impl CaptureScheduler {
    pub fn new(
        pipeline: IngestPipeline,
        position: Arc<dyn PositionProvider>,
        engine: Arc<SyncEngine>,
        nearby: Arc<NearbyMembers>,
        config: CaptureConfig,
        sync_interval: Duration,
    ) -> Self {
        let (app_state, _rx) = watch::channel(AppState::Foreground);
        Self {
            pipeline,
            position,
            engine,
            nearby,
            config,
            sync_interval,
            app_state,
        }
    }

    pub fn app_state(&self) -> AppState {
        *self.app_state.borrow()
    }

    /// Report a platform lifecycle change. Handled after the debounce.
    pub fn set_app_state(&self, state: AppState) {
        self.app_state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    /// Request a fix and ingest it tagged with the current app state.
    pub async fn capture_now(&self) -> Result<IngestOutcome> {
        self.capture(self.app_state().capture_source()).await
    }

    async fn capture(&self, source: CaptureSource) -> Result<IngestOutcome> {
        let fix = self.position.current_fix().await?;
        self.pipeline.ingest(&fix, source)
    }

    async fn capture_logged(&self, source: CaptureSource) {
        match self.capture(source).await {
            Ok(IngestOutcome::Recorded(sample)) => {
                debug!("[CaptureScheduler] Recorded {} ({:?})", sample.id, source)
            }
            Ok(_) => {}
            Err(TrackerError::PermissionDenied) => {
                warn!("[CaptureScheduler] Location permission denied")
            }
            Err(e) => warn!("[CaptureScheduler] Capture failed: {}", e),
        }
    }

    async fn on_app_state(&self, state: AppState) {
        info!("[CaptureScheduler] App state changed to {:?}", state);
        self.capture_logged(state.capture_source()).await;
        self.nearby.refresh_quietly().await;
        if state == AppState::Foreground {
            if let Err(e) = self.engine.drain().await {
                debug!("[CaptureScheduler] Foreground sync skipped: {}", e);
            }
        }
    }

    /// Spawn every trigger. Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> SchedulerTasks {
        let mut handles = Vec::with_capacity(5);

        let scheduler = Arc::clone(self);
        handles.push(events::subscribe(
            TimerSource::every(self.config.foreground_interval()),
            move |_| {
                let scheduler = Arc::clone(&scheduler);
                async move {
                    if scheduler.app_state() == AppState::Foreground {
                        scheduler.capture_logged(CaptureSource::Foreground).await;
                    }
                }
            },
        ));

        let (tx, background) = ChannelSource::bounded(BACKGROUND_FEED_CAPACITY);
        let mut filter = BackgroundFilter::from_config(&self.config);
        let pipeline = self.pipeline.clone();
        handles.push(events::subscribe(background, move |fix: Fix| {
            let accepted = filter.accept(&fix);
            let pipeline = pipeline.clone();
            async move {
                if !accepted {
                    debug!("[CaptureScheduler] Background fix filtered");
                    return;
                }
                if let Err(e) = pipeline.ingest(&fix, CaptureSource::Background) {
                    warn!("[CaptureScheduler] Background ingest failed: {}", e);
                }
            }
        }));

        let scheduler = Arc::clone(self);
        let mut handled = self.app_state();
        handles.push(events::subscribe(
            WatchSource::debounced(self.app_state.subscribe(), self.config.app_state_debounce()),
            move |state: AppState| {
                let changed = state != handled;
                handled = state;
                let scheduler = Arc::clone(&scheduler);
                async move {
                    if changed {
                        scheduler.on_app_state(state).await;
                    }
                }
            },
        ));

        let engine = Arc::clone(&self.engine);
        handles.push(events::subscribe(
            TimerSource::every(self.sync_interval),
            move |_| {
                let engine = Arc::clone(&engine);
                async move {
                    if let Err(e) = engine.drain().await {
                        debug!("[CaptureScheduler] Periodic sync skipped: {}", e);
                    }
                }
            },
        ));

        let scheduler = Arc::clone(self);
        handles.push(events::subscribe(
            TimerSource::every(self.config.nearby_interval()),
            move |_| {
                let scheduler = Arc::clone(&scheduler);
                async move {
                    if scheduler.app_state() == AppState::Foreground {
                        scheduler.nearby.refresh_quietly().await;
                    }
                }
            },
        ));

        SchedulerTasks {
            feed: BackgroundFeed { tx },
            handles,
        }
    }
}
