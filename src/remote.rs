//! Remote endpoint interface and wire payloads.
//!
//! The sync engine only depends on [`LocationRemote`]; the reqwest client in
//! [`crate::http`] is one implementation, test fakes are another.

use chrono::SecondsFormat;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::Credentials;
use crate::types::{LocationSample, NearbyMember};

/// Body of `POST /location/update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// RFC 3339, millisecond precision, `Z` suffix
    pub timestamp: String,
    pub background: bool,
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub offline_sync: bool,
}

impl LocationUpdate {
    pub fn from_sample(sample: &LocationSample, credentials: &Credentials, offline_sync: bool) -> Self {
        Self {
            user_id: credentials.user_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            timestamp: sample
                .captured_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            background: sample.capture_source.is_background(),
            group_id: sample.group_id.clone(),
            session_id: sample.session_id.clone(),
            offline_sync,
        }
    }
}

/// Body of `GET /groups/{groupId}/nearby-members`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NearbyMembersResponse {
    #[serde(default)]
    pub members: Vec<NearbyMember>,
}

/// The remote location service.
///
/// Any 2xx is success. Non-2xx maps to [`crate::TrackerError::RemoteRejected`],
/// connection failures to [`crate::TrackerError::Transport`].
pub trait LocationRemote: Send + Sync {
    fn post_location<'a>(
        &'a self,
        token: &'a str,
        update: &'a LocationUpdate,
    ) -> BoxFuture<'a, Result<()>>;

    fn nearby_members<'a>(
        &'a self,
        token: &'a str,
        group_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<NearbyMember>>>;
}
