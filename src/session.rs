//! # Session Gate
//!
//! Owns the current group-session record and the archive of completed
//! sessions. Capture is only persisted while a session is active; every
//! other component reads the session through [`SessionGate::evaluate`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use ulid::Ulid;

use crate::error::{Result, TrackerError};
use crate::storage::{keys, Record, SharedStore};
use crate::types::{SessionContext, SessionStatus};

/// Default number of completed sessions retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

impl Record for Option<SessionContext> {
    fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value::<LegacySession>(value).map(|s| Some(s.into_context()))
    }
}

impl Record for Vec<SessionContext> {
    fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
        let legacy: Vec<LegacySession> = serde_json::from_value(value)?;
        Ok(legacy.into_iter().map(LegacySession::into_context).collect())
    }
}

/// Session record as written by the first app release (no session id).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySession {
    group_id: Value,
    started_at: DateTime<Utc>,
    status: SessionStatus,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
}

impl LegacySession {
    fn into_context(self) -> SessionContext {
        let group_id = match self.group_id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        SessionContext {
            session_id: format!("legacy-{}-{}", group_id, self.started_at.timestamp_millis()),
            group_id,
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }
}

/// Result of a gate check.
#[derive(Debug, Clone, PartialEq)]
pub struct GateDecision {
    pub allowed: bool,
    pub context: Option<SessionContext>,
}

/// Reads and transitions the device's group session.
#[derive(Clone)]
pub struct SessionGate {
    store: SharedStore,
    history_capacity: usize,
}

impl SessionGate {
    pub fn new(store: SharedStore) -> Self {
        Self::with_history_capacity(store, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(store: SharedStore, history_capacity: usize) -> Self {
        Self {
            store,
            history_capacity,
        }
    }

    /// Current session, active or not.
    pub fn current(&self) -> Option<SessionContext> {
        self.store.load(keys::CURRENT_SESSION)
    }

    /// Decide whether a capture may be persisted. No side effects.
    pub fn evaluate(&self) -> GateDecision {
        let context = self.current();
        GateDecision {
            allowed: context.as_ref().is_some_and(SessionContext::is_active),
            context,
        }
    }

    /// Begin a session for `group_id`. At most one session may be active.
    pub fn start_session(&self, group_id: &str) -> Result<SessionContext> {
        let started = self.store.update(
            keys::CURRENT_SESSION,
            |current: &mut Option<SessionContext>| {
                if let Some(active) = current.as_ref().filter(|s| s.is_active()) {
                    let err = TrackerError::SessionAlreadyActive {
                        group_id: active.group_id.clone(),
                    };
                    return (Err(err), false);
                }
                let context = SessionContext {
                    group_id: group_id.to_string(),
                    session_id: Ulid::new().to_string(),
                    status: SessionStatus::Active,
                    started_at: Utc::now(),
                    ended_at: None,
                };
                *current = Some(context.clone());
                (Ok(context), true)
            },
        )??;

        log::info!(
            "[SessionGate] Started session {} for group {}",
            started.session_id,
            started.group_id
        );
        Ok(started)
    }

    /// End the current session and archive it. Returns `None` when no
    /// session exists.
    ///
    /// The session is archived before it is cleared, so a failed write
    /// leaves it current and the call can be retried.
    pub fn end_session(&self) -> Result<Option<SessionContext>> {
        let Some(mut ended) = self.current() else {
            return Ok(None);
        };
        ended.status = SessionStatus::Completed;
        ended.ended_at = Some(Utc::now());

        let capacity = self.history_capacity;
        let archived = ended.clone();
        self.store
            .update(keys::SESSION_HISTORY, |history: &mut Vec<SessionContext>| {
                // A retried or concurrent end replaces the earlier entry
                history.retain(|s| s.session_id != archived.session_id);
                history.insert(0, archived);
                history.truncate(capacity);
                ((), true)
            })
            .inspect_err(|e| {
                log::warn!(
                    "[SessionGate] Session {} stays active, archive failed: {}",
                    ended.session_id,
                    e
                )
            })?;

        let session_id = ended.session_id.clone();
        self.store.update(
            keys::CURRENT_SESSION,
            |current: &mut Option<SessionContext>| {
                let matches = current
                    .as_ref()
                    .is_some_and(|s| s.session_id == session_id);
                if matches {
                    *current = None;
                }
                ((), matches)
            },
        )?;

        log::info!(
            "[SessionGate] Ended session {} for group {}",
            ended.session_id,
            ended.group_id
        );
        Ok(Some(ended))
    }

    /// Completed sessions, newest first.
    pub fn history(&self) -> Vec<SessionContext> {
        self.store.load(keys::SESSION_HISTORY)
    }

    /// Forget the current session without archiving it (logout reset).
    pub fn clear_current(&self) -> Result<()> {
        self.store.remove(keys::CURRENT_SESSION)
    }
}
