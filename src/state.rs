//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! owns the cookie signing key, the per-browser session registry and the
//! member-area services, all sharing one document store.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::config::AppConfig;
use crate::services::{FeedService, MessageService, NotificationService, ProfileService};
use crate::session::{AuthBackend, CompanionProfiles, PropagatorOptions, SessionRegistry};
use crate::store::DocumentStore;

/// Shared application state. Clone is required by Axum; every field is
/// Arc-backed or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Signs the `logged_in`, `role` and `sid` cookies.
    pub cookie_key: Key,
    pub sessions: SessionRegistry,
    pub profiles: ProfileService,
    pub notifications: NotificationService,
    pub feed: FeedService,
    pub messages: MessageService,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthBackend>) -> Self {
        let cookie_key = cookie_key(&config);
        let profiles = ProfileService::new(store.clone(), config.admin_emails.clone());
        let notifications = NotificationService::new(store.clone());
        let feed = FeedService::new(store.clone(), notifications.clone());
        let messages = MessageService::new(store, profiles.clone(), notifications.clone());

        let companion: Arc<dyn CompanionProfiles> = Arc::new(profiles.clone());
        let options = PropagatorOptions { profiles: Some(companion), call_timeout: config.auth_call_timeout };
        let sessions = SessionRegistry::new(auth, options);

        Self { config: Arc::new(config), cookie_key, sessions, profiles, notifications, feed, messages }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Key from the configured secret, or a random one that does not survive a restart.
fn cookie_key(config: &AppConfig) -> Key {
    if let Some(secret) = &config.cookie_secret {
        match Key::try_from(secret.as_slice()) {
            Ok(key) => return key,
            Err(e) => tracing::warn!(error = %e, "COOKIE_SECRET rejected; using an ephemeral key"),
        }
    } else {
        tracing::warn!("COOKIE_SECRET not set; signed cookies will not survive a restart");
    }
    Key::generate()
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::collections::HashSet;

    use super::*;
    use crate::session::memory::MemoryAuthBackend;
    use crate::store::MemoryDocumentStore;

    pub const ADMIN_EMAIL: &str = "chair@club.edu";

    /// Memory-backed `AppState` with `chair@club.edu` as the only admin.
    #[must_use]
    pub fn test_app_state() -> AppState {
        let config = AppConfig {
            cookie_secret: Some(vec![7; crate::config::COOKIE_SECRET_MIN_LEN]),
            admin_emails: HashSet::from([ADMIN_EMAIL.to_owned()]),
            ..AppConfig::default()
        };
        AppState::new(config, Arc::new(MemoryDocumentStore::new()), Arc::new(MemoryAuthBackend::new()))
    }
}
