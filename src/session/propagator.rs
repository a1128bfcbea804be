//! Session propagator: mirrors one auth client into a [`SessionStore`].
//!
//! ARCHITECTURE
//! ============
//! `mount` subscribes to the client and spawns a pump task that applies each
//! notification to the store in the order the client emitted it. Sign-up,
//! sign-in and sign-out go through [`SessionPropagator::run`], which keeps an
//! [`AuthOperationState`] envelope current for observers.
//!
//! ERROR HANDLING
//! ==============
//! Provider rejections are stored as a human-readable message and returned to
//! the caller. On sign-up the account is authoritative: a failed display-name
//! update or companion profile write is logged and swallowed.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::provider::{AuthClient, AuthError, Identity};
use super::store::SessionStore;
use crate::services::ServiceError;

/// Pending/error envelope around the most recent auth operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthOperationState {
    pub pending: bool,
    pub last_error: Option<String>,
}

/// Best-effort profile record written after an account is created.
#[async_trait::async_trait]
pub trait CompanionProfiles: Send + Sync {
    async fn create_companion_profile(&self, identity: &Identity, display_name: &str) -> Result<(), ServiceError>;
}

#[derive(Clone, Default)]
pub struct PropagatorOptions {
    pub profiles: Option<Arc<dyn CompanionProfiles>>,
    /// Per provider call. `None` lets a hung call stay pending.
    pub call_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

pub struct SessionPropagator {
    client: Arc<dyn AuthClient>,
    store: SessionStore,
    operation: Arc<watch::Sender<AuthOperationState>>,
    in_flight: Arc<AtomicUsize>,
    options: PropagatorOptions,
    pump: JoinHandle<()>,
}

impl SessionPropagator {
    /// Subscribe to `client` and start mirroring its session.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn mount(client: Arc<dyn AuthClient>, options: PropagatorOptions) -> Self {
        let store = SessionStore::new();
        let mut subscription = client.subscribe();
        let pump_store = store.clone();
        let pump = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                pump_store.apply(event);
                debug!(status = ?pump_store.snapshot().status(), "session change");
            }
        });

        let (operation, _rx) = watch::channel(AuthOperationState::default());
        Self {
            client,
            store,
            operation: Arc::new(operation),
            in_flight: Arc::new(AtomicUsize::new(0)),
            options,
            pump,
        }
    }

    /// Stop mirroring. Dropping the pump drops the subscription, which unsubscribes.
    pub fn teardown(&self) {
        self.pump.abort();
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn operation_state(&self) -> AuthOperationState {
        self.operation.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_operation(&self) -> watch::Receiver<AuthOperationState> {
        self.operation.subscribe()
    }

    // =========================================================================
    // OPERATIONS
    // =========================================================================

    /// Create an account, name it, then write the companion profile.
    pub async fn sign_up(&self, request: SignUp) -> Result<Identity, AuthError> {
        self.run("sign_up", async {
            let identity = self
                .provider_call(self.client.create_account(&request.email, &request.password))
                .await?;
            info!(uid = %identity.uid, "account created");

            let display_name = request
                .display_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map_or_else(|| default_display_name(&identity.email), str::to_owned);

            let identity = match self.provider_call(self.client.update_display_name(&display_name)).await {
                Ok(renamed) => renamed,
                Err(e) => {
                    warn!(uid = %identity.uid, error = %e, "display name update failed after sign-up");
                    identity
                }
            };

            if let Some(profiles) = &self.options.profiles {
                if let Err(e) = profiles.create_companion_profile(&identity, &display_name).await {
                    warn!(uid = %identity.uid, error = %e, "companion profile creation failed; account kept");
                }
            }

            Ok(identity)
        })
        .await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.run("sign_in", self.provider_call(self.client.sign_in(email, password)))
            .await
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.run("sign_out", self.provider_call(self.client.sign_out()))
            .await
    }

    /// Rename the signed-in user. Not wrapped in the operation envelope.
    pub async fn update_display_name(&self, name: &str) -> Result<Identity, AuthError> {
        self.provider_call(self.client.update_display_name(name))
            .await
    }

    // =========================================================================
    // ENVELOPE
    // =========================================================================

    async fn run<T>(&self, op: &'static str, call: impl Future<Output = Result<T, AuthError>>) -> Result<T, AuthError> {
        let _pending = PendingGuard::begin(&self.operation, &self.in_flight);
        let result = call.await;
        match &result {
            Ok(_) => self.operation.send_modify(|state| state.last_error = None),
            Err(e) => {
                warn!(op, error = %e, "auth operation failed");
                let message = e.to_string();
                self.operation.send_modify(|state| state.last_error = Some(message));
            }
        }
        result
    }

    async fn provider_call<T>(&self, call: impl Future<Output = Result<T, AuthError>>) -> Result<T, AuthError> {
        match self.options.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(AuthError::Timeout(limit))),
            None => call.await,
        }
    }
}

impl Drop for SessionPropagator {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Marks an operation in flight; clears `pending` when the last one finishes,
/// including when the operation future is dropped mid-call.
struct PendingGuard<'a> {
    operation: &'a watch::Sender<AuthOperationState>,
    in_flight: &'a AtomicUsize,
}

impl<'a> PendingGuard<'a> {
    fn begin(operation: &'a watch::Sender<AuthOperationState>, in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        operation.send_modify(|state| {
            state.pending = true;
            state.last_error = None;
        });
        Self { operation, in_flight }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let remaining = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.operation.send_modify(|state| state.pending = remaining > 0);
    }
}

/// Local part of the email, used when sign-up supplies no name.
fn default_display_name(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|local| !local.trim().is_empty())
        .unwrap_or("member")
        .to_owned()
}

#[cfg(test)]
#[path = "propagator_test.rs"]
mod tests;
