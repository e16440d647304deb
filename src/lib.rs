//! # Trailsync
//!
//! Offline-first location tracking core for group hiking sessions.
//!
//! This library provides:
//! - A durable queue of GPS samples captured while a group session is active
//! - A bounded path trace for drawing the user's own track
//! - A sync engine that drains the queue to the remote service when online
//! - Capture triggers (foreground timer, background feed, app-state changes)
//!
//! ## Features
//!
//! - **`http`** - reqwest client for the remote location service
//! - **`persistence`** - SQLite-backed durable store
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use trailsync::{CaptureSource, Fix, NewSample, OfflineQueueStore, SessionGate, SharedStore};
//!
//! let store = SharedStore::in_memory();
//! let gate = SessionGate::new(store.clone());
//! let queue = OfflineQueueStore::new(store.clone());
//!
//! let session = gate.start_session("42").unwrap();
//! assert!(gate.evaluate().allowed);
//!
//! let fix = Fix::new(54.6872, 25.2797);
//! let sample = queue
//!     .append(NewSample::from_fix(&fix, CaptureSource::Foreground, Some(&session)))
//!     .unwrap();
//! assert!(!sample.synced);
//! ```

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackerError};

pub mod config;
pub use config::{CaptureConfig, SyncConfig, TrackerConfig};

pub mod types;
pub use types::{
    haversine_distance, AppState, CaptureSource, Fix, LocationSample, LocationSettings,
    NearbyMember, NewSample, OfflineStats, PathPoint, SessionContext, SessionStatus, SyncResult,
};

// Key/blob persistence with versioned records
pub mod storage;
pub use storage::{DurableStore, MemoryStore, SharedStore};
#[cfg(feature = "persistence")]
pub use storage::SqliteStore;

pub mod queue;
pub use queue::OfflineQueueStore;

pub mod path_trace;
pub use path_trace::PathTraceStore;

pub mod session;
pub use session::{GateDecision, SessionGate};

pub mod settings;
pub use settings::{SettingsPatch, SettingsStore};

// Collaborators supplied by the host app
pub mod providers;
pub use providers::{AuthProvider, CredentialStore, Credentials, PositionProvider};

pub mod remote;
pub use remote::{LocationRemote, LocationUpdate};

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::HttpRemote;

pub mod connectivity;
pub use connectivity::{ConnectivityMonitor, ConnectivityProbe, Reachability};

pub mod events;
pub use events::{ChannelSource, EventSource, TimerSource, WatchSource};

pub mod sync;
pub use sync::SyncEngine;

pub mod nearby;
pub use nearby::NearbyMembers;

pub mod capture;
pub use capture::{
    BackgroundFeed, BackgroundFilter, CaptureScheduler, DiscardReason, IngestOutcome,
    IngestPipeline,
};

pub mod stats;
pub use stats::StatsAggregator;

pub mod tracker;
pub use tracker::{Tracker, TrackerTasks};

#[cfg(test)]
mod test_support;

/// Route `log` output to logcat on Android. Safe to call more than once.
#[cfg(target_os = "android")]
pub fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrailsyncRust"),
    );
}

#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    // No-op on non-Android platforms; hosts install their own logger
}
