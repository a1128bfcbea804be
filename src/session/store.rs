//! Owned session store.
//!
//! DESIGN
//! ======
//! A `watch` channel holds the one `Session` value. The propagator's pump task
//! is the only writer, through [`SessionStore::apply`]; every other component
//! reads a snapshot or awaits a change. Cloning the store clones the handle,
//! not the session.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::provider::{AuthEvent, Identity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Loading,
    Authenticated,
    Anonymous,
}

impl Session {
    #[must_use]
    pub fn loading() -> Self {
        Self { identity: None, is_loading: true }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match (&self.identity, self.is_loading) {
            (_, true) => SessionStatus::Loading,
            (Some(_), false) => SessionStatus::Authenticated,
            (None, false) => SessionStatus::Anonymous,
        }
    }
}

#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::loading());
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.tx.borrow().identity.clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Replace the session with the state carried by `event`.
    ///
    /// Every event marks the session as loaded, so the first one ends the
    /// `Loading` state and later ones toggle between authenticated and anonymous.
    pub(crate) fn apply(&self, event: AuthEvent) {
        let identity = event.into_identity();
        self.tx.send_replace(Session { identity, is_loading: false });
    }

    /// Wait until `predicate` holds for the current session and return it.
    pub async fn wait_for(&self, predicate: impl FnMut(&Session) -> bool) -> Session {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(predicate).await {
            Ok(session) => (*session).clone(),
            Err(_) => self.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(uid: &str) -> Identity {
        Identity { uid: uid.into(), email: format!("{uid}@club.edu"), display_name: None }
    }

    #[test]
    fn new_store_is_loading() {
        let store = SessionStore::new();
        assert_eq!(store.snapshot(), Session::loading());
        assert_eq!(store.snapshot().status(), SessionStatus::Loading);
    }

    #[test]
    fn first_signed_out_event_ends_loading_as_anonymous() {
        let store = SessionStore::new();
        store.apply(AuthEvent::SignedOut);
        let session = store.snapshot();
        assert!(!session.is_loading);
        assert_eq!(session.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn events_toggle_between_authenticated_and_anonymous() {
        let store = SessionStore::new();
        store.apply(AuthEvent::SignedIn(identity("u1")));
        assert_eq!(store.snapshot().status(), SessionStatus::Authenticated);
        assert_eq!(store.identity().map(|i| i.uid), Some("u1".into()));

        store.apply(AuthEvent::SignedOut);
        assert_eq!(store.snapshot().status(), SessionStatus::Anonymous);

        store.apply(AuthEvent::SignedIn(identity("u2")));
        assert_eq!(store.identity().map(|i| i.uid), Some("u2".into()));
    }

    #[test]
    fn clones_share_one_session() {
        let store = SessionStore::new();
        let reader = store.clone();
        store.apply(AuthEvent::SignedIn(identity("u1")));
        assert_eq!(reader.snapshot().status(), SessionStatus::Authenticated);
    }

    #[tokio::test]
    async fn wait_for_resolves_after_apply() {
        let store = SessionStore::new();
        let writer = store.clone();
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            writer.apply(AuthEvent::SignedIn(identity("u9")));
        });
        let session = store.wait_for(|s| s.identity.is_some()).await;
        assert_eq!(session.identity.map(|i| i.uid), Some("u9".into()));
        handle.await.unwrap();
    }

    #[test]
    fn session_serializes_identity_and_loading_flag() {
        let session = Session { identity: Some(identity("u1")), is_loading: false };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["identity"]["uid"], "u1");
        assert_eq!(json["is_loading"], false);
    }
}
