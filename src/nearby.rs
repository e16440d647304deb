//! Fellow-member positions for display.
//!
//! Read-only: nothing here touches the queue. The last successful list is
//! kept so a failed refresh leaves the previous members on screen.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use crate::connectivity::ConnectivityProbe;
use crate::error::{OptionExt, Result, TrackerError};
use crate::providers::AuthProvider;
use crate::remote::LocationRemote;
use crate::session::SessionGate;
use crate::types::NearbyMember;

pub struct NearbyMembers {
    gate: SessionGate,
    remote: Arc<dyn LocationRemote>,
    auth: Arc<dyn AuthProvider>,
    connectivity: Arc<dyn ConnectivityProbe>,
    timeout: Duration,
    latest: Mutex<Vec<NearbyMember>>,
}

impl NearbyMembers {
    pub fn new(
        gate: SessionGate,
        remote: Arc<dyn LocationRemote>,
        auth: Arc<dyn AuthProvider>,
        connectivity: Arc<dyn ConnectivityProbe>,
        timeout: Duration,
    ) -> Self {
        Self {
            gate,
            remote,
            auth,
            connectivity,
            timeout,
            latest: Mutex::new(Vec::new()),
        }
    }

    /// Fetch members of the current session's group.
    pub async fn refresh(&self) -> Result<Vec<NearbyMember>> {
        let session = self.gate.current().ok_or(TrackerError::NoActiveSession)?;
        if !self.connectivity.is_online() {
            return Err(TrackerError::Offline);
        }
        let credentials = self.auth.credentials().ok_or_auth_missing()?;

        let members = tokio::time::timeout(
            self.timeout,
            self.remote
                .nearby_members(&credentials.token, &session.group_id),
        )
        .await
        .map_err(|_| TrackerError::Timeout {
            after_ms: self.timeout.as_millis() as u64,
        })?
        .inspect_err(|e| warn!("[NearbyMembers] Refresh for group {} failed: {}", session.group_id, e))?;

        debug!(
            "[NearbyMembers] Group {}: {} members",
            session.group_id,
            members.len()
        );
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = members.clone();
        Ok(members)
    }

    /// Refresh and log the outcome; used by the background triggers.
    pub async fn refresh_quietly(&self) {
        if let Err(e) = self.refresh().await {
            debug!("[NearbyMembers] Skipped refresh: {}", e);
        }
    }

    /// Last successfully fetched list.
    pub fn latest(&self) -> Vec<NearbyMember> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear(&self) {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
