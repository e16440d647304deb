//! HTTP client for the location service.
//!
//! Thin reqwest wrapper implementing [`LocationRemote`]:
//! - Connection pooling across the sequential drain requests
//! - Bearer auth per request (tokens can rotate between drains)
//! - Client-level timeout as a backstop to the engine's per-item bound

use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use reqwest::{Client, StatusCode};

use crate::error::{Result, TrackerError};
use crate::remote::{LocationRemote, LocationUpdate, NearbyMembersResponse};
use crate::types::NearbyMember;

/// reqwest-backed remote endpoint.
pub struct HttpRemote {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRemote {
    /// Create a client for `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Transport {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn update_url(&self) -> String {
        format!("{}/location/update", self.base_url)
    }

    pub fn nearby_url(&self, group_id: &str) -> String {
        format!("{}/groups/{}/nearby-members", self.base_url, group_id)
    }

    fn classify(&self, e: reqwest::Error) -> TrackerError {
        if e.is_timeout() {
            TrackerError::Timeout {
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            TrackerError::Transport {
                message: e.to_string(),
            }
        }
    }

    fn check_status(status: StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(TrackerError::RemoteRejected {
                status: status.as_u16(),
            })
        }
    }
}

impl LocationRemote for HttpRemote {
    fn post_location<'a>(
        &'a self,
        token: &'a str,
        update: &'a LocationUpdate,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.update_url())
                .bearer_auth(token)
                .json(update)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            debug!("[HttpRemote] POST location/update -> {}", response.status());
            Self::check_status(response.status())
        })
    }

    fn nearby_members<'a>(
        &'a self,
        token: &'a str,
        group_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<NearbyMember>>> {
        Box::pin(async move {
            let response = self
                .client
                .get(self.nearby_url(group_id))
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            Self::check_status(response.status())?;
            let body: NearbyMembersResponse = response.json().await.map_err(|e| {
                TrackerError::Transport {
                    message: format!("Parse error: {}", e),
                }
            })?;
            Ok(body.members)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let remote = HttpRemote::new("https://api.example.com/api/", Duration::from_secs(10)).unwrap();
        assert_eq!(remote.update_url(), "https://api.example.com/api/location/update");
        assert_eq!(
            remote.nearby_url("17"),
            "https://api.example.com/api/groups/17/nearby-members"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(HttpRemote::check_status(StatusCode::NO_CONTENT).is_ok());
        assert_eq!(
            HttpRemote::check_status(StatusCode::INTERNAL_SERVER_ERROR),
            Err(TrackerError::RemoteRejected { status: 500 })
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let remote = HttpRemote::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let update = LocationUpdate {
            user_id: 1,
            latitude: 0.0,
            longitude: 0.0,
            timestamp: "2026-10-19T00:00:00.000Z".to_string(),
            background: false,
            group_id: None,
            session_id: None,
            offline_sync: true,
        };
        let err = remote.post_location("t", &update).await.unwrap_err();
        assert!(err.is_item_failure());
    }
}
