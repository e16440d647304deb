//! Unified error handling for the trailsync library.
//!
//! Every fallible operation in the crate returns [`TrackerError`], so capture,
//! storage and sync failures can be classified in one place.

use thiserror::Error;

/// Unified error type for tracker operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackerError {
    /// No network reachability at drain time
    #[error("No internet connection")]
    Offline,
    /// No bearer token / user id available
    #[error("Authentication credentials missing")]
    AuthMissing,
    /// Remote endpoint answered with a non-2xx status
    #[error("Remote rejected request (HTTP {status})")]
    RemoteRejected { status: u16 },
    /// Request exceeded its per-item bound
    #[error("Request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    /// Connection / TLS / body failure
    #[error("Transport error: {message}")]
    Transport { message: String },
    /// Durable store failed to read or write
    #[error("Storage error: {message}")]
    Storage { message: String },
    /// Stored blob could not be encoded or decoded
    #[error("Could not decode '{key}': {message}")]
    Codec { key: String, message: String },
    /// Stored blob was written by a newer schema
    #[error("Key '{key}' has unsupported schema version {version}")]
    UnsupportedSchema { key: String, version: u32 },
    /// Positioning permission not granted
    #[error("Location permission denied")]
    PermissionDenied,
    /// Positioning subsystem could not produce a fix
    #[error("Positioning failed: {message}")]
    Positioning { message: String },
    /// No group session to report against
    #[error("No active group session")]
    NoActiveSession,
    /// A session is already active on this device
    #[error("Session already active for group '{group_id}'")]
    SessionAlreadyActive { group_id: String },
    /// A drain is already running
    #[error("Sync already in progress")]
    DrainInProgress,
}

impl TrackerError {
    /// Failures that only affect a single queued sample during a drain.
    pub fn is_item_failure(&self) -> bool {
        matches!(
            self,
            TrackerError::RemoteRejected { .. }
                | TrackerError::Timeout { .. }
                | TrackerError::Transport { .. }
        )
    }

    pub(crate) fn storage(message: impl std::fmt::Display) -> Self {
        TrackerError::Storage {
            message: message.to_string(),
        }
    }

    pub(crate) fn codec(key: &str, message: impl std::fmt::Display) -> Self {
        TrackerError::Codec {
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Extension trait for converting Option to TrackerError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an auth-missing error.
    fn ok_or_auth_missing(self) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_auth_missing(self) -> Result<T> {
        self.ok_or(TrackerError::AuthMissing)
    }
}
