//! Core record types shared by every component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two coordinates in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    EARTH_RADIUS_M * 2.0 * a.sqrt().asin()
}

/// Which trigger produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    Foreground,
    Background,
}

impl CaptureSource {
    pub fn is_background(self) -> bool {
        self == CaptureSource::Background
    }
}

/// Host application lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Foreground,
    Background,
}

impl AppState {
    /// Source tag for captures taken while in this state.
    pub fn capture_source(self) -> CaptureSource {
        match self {
            AppState::Foreground => CaptureSource::Foreground,
            AppState::Background => CaptureSource::Background,
        }
    }
}

/// A position reported by the positioning subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the platform reports it.
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    /// Create a fix stamped with the current time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp: Utc::now(),
        }
    }

    pub fn at(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            timestamp,
        }
    }

    /// Check if the fix has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to another fix in meters.
    pub fn distance_to(&self, other: &Fix) -> f64 {
        haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// A captured location waiting for (or past) delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// ULID; unique for the lifetime of the queue.
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
    pub capture_source: CaptureSource,
    /// Only ever moves from false to true.
    pub synced: bool,
    /// Session active when the sample was captured.
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Sample fields supplied by the caller; the queue assigns id and sync state.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSample {
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
    pub capture_source: CaptureSource,
    pub group_id: Option<String>,
    pub session_id: Option<String>,
}

impl NewSample {
    pub fn from_fix(fix: &Fix, source: CaptureSource, session: Option<&SessionContext>) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            captured_at: fix.timestamp,
            capture_source: source,
            group_id: session.map(|s| s.group_id.clone()),
            session_id: session.map(|s| s.session_id.clone()),
        }
    }
}

/// A point in the bounded display trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
}

impl PathPoint {
    pub fn new(latitude: f64, longitude: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            captured_at,
        }
    }
}

impl From<&LocationSample> for PathPoint {
    fn from(sample: &LocationSample) -> Self {
        Self::new(sample.latitude, sample.longitude, sample.captured_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// The group session this device is (or was) participating in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub group_id: String,
    pub session_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Outcome counts of one drain. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub synced_count: u32,
    pub failed_count: u32,
    /// Pending count at the start of the drain.
    pub total_pending: u32,
}

/// Persisted user preferences for tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub tracking_enabled: bool,
    pub path_recording: bool,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            tracking_enabled: true,
            path_recording: true,
        }
    }
}

/// Read-only snapshot for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineStats {
    pub total_offline_locations: u32,
    pub unsynced_locations: u32,
    pub synced_locations: u32,
    pub path_points: u32,
    pub settings: LocationSettings,
}

/// A fellow group member as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyMember {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub last_seen: Option<String>,
}
