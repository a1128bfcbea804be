//! Auth provider seam.
//!
//! ARCHITECTURE
//! ============
//! The hosted auth platform is reached through two traits. [`AuthBackend`]
//! is the platform itself and hands out one [`AuthClient`] per browser
//! session. An `AuthClient` owns that browser's signed-in state and
//! broadcasts every change to its subscribers.
//!
//! Subscriptions are explicit handles: events arrive in emission order on an
//! unbounded channel, and dropping or calling [`AuthSubscription::unsubscribe`]
//! detaches the listener.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Opaque handle for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Session-change notification emitted by an [`AuthClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Identity),
    SignedOut,
}

impl AuthEvent {
    #[must_use]
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            Self::SignedIn(identity) => Some(identity),
            Self::SignedOut => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("an account already exists for this email")]
    EmailInUse,
    #[error("incorrect email or password")]
    InvalidCredentials,
    #[error("not signed in")]
    NotSignedIn,
    #[error("auth provider did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

type CancelFn = Box<dyn FnOnce() + Send>;

/// Listener handle returned by [`AuthClient::subscribe`].
pub struct AuthSubscription {
    events: mpsc::UnboundedReceiver<AuthEvent>,
    cancel: Option<CancelFn>,
}

impl AuthSubscription {
    pub fn new(events: mpsc::UnboundedReceiver<AuthEvent>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { events, cancel: Some(Box::new(cancel)) }
    }

    /// Next event, or `None` once the provider has dropped the sender.
    pub async fn next(&mut self) -> Option<AuthEvent> {
        self.events.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.events.close();
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// One browser's view of the auth platform.
///
/// # Contract
///
/// - `subscribe` immediately queues the current state, then every later change.
/// - A successful `sign_in`/`create_account` emits `SignedIn` before returning;
///   `sign_out` emits `SignedOut` before returning.
/// - Failed calls emit nothing.
#[async_trait::async_trait]
pub trait AuthClient: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Rename the signed-in user and re-emit `SignedIn` with the new name.
    async fn update_display_name(&self, name: &str) -> Result<Identity, AuthError>;

    fn subscribe(&self) -> AuthSubscription;
}

/// The auth platform, handing out per-browser clients.
pub trait AuthBackend: Send + Sync {
    fn connect(&self) -> Arc<dyn AuthClient>;
}
