//! Interfaces to the platform collaborators the core consumes but does not
//! implement: authentication and positioning.

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::Fix;

/// Bearer token and numeric user id issued at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub user_id: i64,
}

impl Credentials {
    pub fn new(token: impl Into<String>, user_id: i64) -> Self {
        Self {
            token: token.into(),
            user_id,
        }
    }
}

/// Supplies credentials for remote calls.
pub trait AuthProvider: Send + Sync {
    /// Current credentials, or `None` when logged out.
    fn credentials(&self) -> Option<Credentials>;
}

/// Credential holder the host app fills after login.
#[derive(Debug, Default, Clone)]
pub struct CredentialStore {
    inner: Arc<RwLock<Option<Credentials>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        let store = Self::new();
        store.set(Some(credentials));
        store
    }

    pub fn set(&self, credentials: Option<Credentials>) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = credentials;
    }
}

impl AuthProvider for CredentialStore {
    fn credentials(&self) -> Option<Credentials> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// On-demand positioning.
///
/// Implementations return [`crate::TrackerError::PermissionDenied`] when the
/// user has not granted location access.
pub trait PositionProvider: Send + Sync {
    fn current_fix(&self) -> BoxFuture<'_, Result<Fix>>;
}
