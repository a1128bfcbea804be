//! Per-browser session registry.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server plays the browser's role towards the auth platform: each signed
//! `sid` cookie owns one [`SessionPropagator`] connected to its own auth
//! client. Handlers look the propagator up to read the caller's session or to
//! run sign-in/sign-out on it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::propagator::{PropagatorOptions, SessionPropagator};
use super::provider::AuthBackend;
use super::token::generate_session_id;

#[derive(Clone)]
pub struct SessionRegistry {
    backend: Arc<dyn AuthBackend>,
    options: PropagatorOptions,
    sessions: Arc<RwLock<HashMap<String, Arc<SessionPropagator>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(backend: Arc<dyn AuthBackend>, options: PropagatorOptions) -> Self {
        Self { backend, options, sessions: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub async fn get(&self, sid: &str) -> Option<Arc<SessionPropagator>> {
        self.sessions.read().await.get(sid).cloned()
    }

    /// Return the propagator for `sid`, mounting a fresh one under a new id
    /// when `sid` is absent or unknown.
    pub async fn open(&self, sid: Option<&str>) -> (String, Arc<SessionPropagator>) {
        if let Some(sid) = sid {
            if let Some(existing) = self.get(sid).await {
                return (sid.to_owned(), existing);
            }
        }

        let sid = generate_session_id();
        let propagator = Arc::new(SessionPropagator::mount(self.backend.connect(), self.options.clone()));
        self.sessions
            .write()
            .await
            .insert(sid.clone(), propagator.clone());
        let sessions = self.len().await;
        info!(sessions, "browser session opened");
        (sid, propagator)
    }

    /// Remove and tear down the propagator for `sid`.
    pub async fn close(&self, sid: &str) -> Option<Arc<SessionPropagator>> {
        let removed = self.sessions.write().await.remove(sid);
        if let Some(propagator) = &removed {
            propagator.teardown();
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
