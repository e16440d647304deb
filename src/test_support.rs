//! Fakes shared by the unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::{Result, TrackerError};
use crate::providers::PositionProvider;
use crate::remote::{LocationRemote, LocationUpdate};
use crate::types::{Fix, NearbyMember};

/// Remote that records every update and fails on chosen call indices.
/// Configure it through the builder methods.
#[derive(Default)]
pub struct FakeRemote {
    reject_calls: HashSet<usize>,
    slow_calls: HashSet<usize>,
    latency: Duration,
    members: Vec<NearbyMember>,
    calls: AtomicUsize,
    received: Mutex<Vec<LocationUpdate>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(calls: &[usize]) -> Self {
        Self {
            reject_calls: calls.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Calls at these indices hang well past any request timeout.
    pub fn slow_on(mut self, calls: &[usize]) -> Self {
        self.slow_calls = calls.iter().copied().collect();
        self
    }

    /// Delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_members(mut self, members: Vec<NearbyMember>) -> Self {
        self.members = members;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<LocationUpdate> {
        self.received.lock().unwrap().clone()
    }
}

impl LocationRemote for FakeRemote {
    fn post_location<'a>(
        &'a self,
        _token: &'a str,
        update: &'a LocationUpdate,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let index = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.slow_calls.contains(&index) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.reject_calls.contains(&index) {
                return Err(TrackerError::RemoteRejected { status: 500 });
            }
            self.received.lock().unwrap().push(update.clone());
            Ok(())
        })
    }

    fn nearby_members<'a>(
        &'a self,
        _token: &'a str,
        _group_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<NearbyMember>>> {
        Box::pin(async move { Ok(self.members.clone()) })
    }
}

/// Positioning that always reports the same coordinate, or a fixed error.
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub error: Option<TrackerError>,
}

impl FixedPosition {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            error: None,
        }
    }

    pub fn failing(error: TrackerError) -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            error: Some(error),
        }
    }
}

impl PositionProvider for FixedPosition {
    fn current_fix(&self) -> BoxFuture<'_, Result<Fix>> {
        Box::pin(async move {
            match &self.error {
                Some(e) => Err(e.clone()),
                None => Ok(Fix::new(self.latitude, self.longitude)),
            }
        })
    }
}
