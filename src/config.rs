//! Tracker configuration.
//!
//! All intervals are stored as integer milliseconds so the config can be
//! loaded from the same JSON the host app keeps its settings in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};

/// Configuration for capture triggers and local retention limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Foreground timer period.
    /// Default: 10 000 ms (dense sampling under tree cover)
    pub foreground_interval_ms: u64,

    /// Minimum spacing between accepted background deliveries.
    /// Default: 30 000 ms
    pub background_interval_ms: u64,

    /// Minimum displacement between accepted background deliveries.
    /// Set to 0.0 to accept stationary fixes. Default: 5.0 meters
    pub min_displacement_m: f64,

    /// Nearby-members refresh period while in the foreground.
    /// Default: 30 000 ms
    pub nearby_interval_ms: u64,

    /// Debounce applied to foreground/background transitions.
    /// Default: 1 000 ms
    pub app_state_debounce_ms: u64,

    /// Maximum number of points kept in the path trace.
    /// Default: 1000 (about 5-6 hours at foreground cadence)
    pub path_capacity: usize,

    /// Maximum number of completed sessions kept in history.
    /// Default: 50
    pub history_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            foreground_interval_ms: 10_000,
            background_interval_ms: 30_000,
            min_displacement_m: 5.0,
            nearby_interval_ms: 30_000,
            app_state_debounce_ms: 1_000,
            path_capacity: 1000,
            history_capacity: 50,
        }
    }
}

impl CaptureConfig {
    pub fn foreground_interval(&self) -> Duration {
        Duration::from_millis(self.foreground_interval_ms)
    }

    pub fn background_interval(&self) -> Duration {
        Duration::from_millis(self.background_interval_ms)
    }

    pub fn nearby_interval(&self) -> Duration {
        Duration::from_millis(self.nearby_interval_ms)
    }

    pub fn app_state_debounce(&self) -> Duration {
        Duration::from_millis(self.app_state_debounce_ms)
    }
}

/// Configuration for the drain protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the remote API, without trailing slash.
    pub base_url: String,

    /// Per-item request bound. No timeout wraps the whole drain.
    /// Default: 10 000 ms
    pub request_timeout_ms: u64,

    /// Fixed pause between consecutive requests in one drain.
    /// Default: 100 ms
    pub inter_request_delay_ms: u64,

    /// Maximum age of a synced sample before it is pruned.
    /// Default: 24 hours
    pub retention_ms: u64,

    /// Period of the background drain timer.
    /// Default: 120 000 ms
    pub periodic_interval_ms: u64,

    /// Wait after an offline -> online transition before draining.
    /// Default: 1 000 ms
    pub connectivity_debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: "https://your-api-url.com/api".to_string(),
            request_timeout_ms: 10_000,
            inter_request_delay_ms: 100,
            retention_ms: 24 * 60 * 60 * 1000,
            periodic_interval_ms: 120_000,
            connectivity_debounce_ms: 1_000,
        }
    }
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    pub fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }

    pub fn connectivity_debounce(&self) -> Duration {
        Duration::from_millis(self.connectivity_debounce_ms)
    }
}

/// Top-level tracker configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub capture: CaptureConfig,
    pub sync: SyncConfig,
}

impl TrackerConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TrackerError::codec("config", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.capture.path_capacity, 1000);
        assert_eq!(config.capture.history_capacity, 50);
        assert_eq!(config.sync.retention(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.sync.inter_request_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = TrackerConfig::from_json(
            r#"{"sync": {"base_url": "http://localhost:8080/api", "request_timeout_ms": 8000}}"#,
        )
        .unwrap();
        assert_eq!(config.sync.base_url, "http://localhost:8080/api");
        assert_eq!(config.sync.request_timeout(), Duration::from_secs(8));
        assert_eq!(config.sync.periodic_interval_ms, 120_000);
        assert_eq!(config.capture, CaptureConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            TrackerConfig::from_json("{not json"),
            Err(TrackerError::Codec { .. })
        ));
    }
}
