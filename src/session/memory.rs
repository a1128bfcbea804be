//! In-process auth backend.
//!
//! DESIGN
//! ======
//! Accounts live in a shared map keyed by normalized email; each connected
//! client keeps its own signed-in user and subscriber list. Passwords are
//! stored as Argon2id PHC strings, hashed and verified on the blocking pool.
//! This backend stands in for the hosted platform in development and tests.
//!
//! ORDERING
//! ========
//! Events are sent while the client's state lock is held, so concurrent
//! sign-in/sign-out calls on one client reach every subscriber in the same
//! order they were applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::provider::{AuthBackend, AuthClient, AuthError, AuthEvent, AuthSubscription, Identity};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    display_name: Option<String>,
    password_hash: String,
}

impl Account {
    fn identity(&self) -> Identity {
        Identity { uid: self.uid.clone(), email: self.email.clone(), display_name: self.display_name.clone() }
    }
}

type Accounts = Arc<RwLock<HashMap<String, Account>>>;

// =============================================================================
// BACKEND
// =============================================================================

#[derive(Clone, Default)]
pub struct MemoryAuthBackend {
    accounts: Accounts,
}

impl MemoryAuthBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn client(&self) -> MemoryAuthClient {
        MemoryAuthClient { accounts: self.accounts.clone(), inner: Arc::new(Mutex::new(ClientInner::default())) }
    }
}

impl AuthBackend for MemoryAuthBackend {
    fn connect(&self) -> Arc<dyn AuthClient> {
        Arc::new(self.client())
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Default)]
struct ClientInner {
    current: Option<Identity>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<AuthEvent>>,
    next_subscriber: u64,
}

impl ClientInner {
    fn set_current(&mut self, identity: Option<Identity>) {
        let event = match &identity {
            Some(identity) => AuthEvent::SignedIn(identity.clone()),
            None => AuthEvent::SignedOut,
        };
        self.current = identity;
        self.subscribers.retain(|_, tx| tx.send(event.clone()).is_ok());
    }
}

pub struct MemoryAuthClient {
    accounts: Accounts,
    inner: Arc<Mutex<ClientInner>>,
}

impl MemoryAuthClient {
    fn lock(&self) -> std::sync::MutexGuard<'_, ClientInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

#[async_trait::async_trait]
impl AuthClient for MemoryAuthClient {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword { min: MIN_PASSWORD_LEN });
        }

        let taken = self.accounts.read().unwrap_or_else(PoisonError::into_inner).contains_key(&email);
        if taken {
            return Err(AuthError::EmailInUse);
        }
        let password_hash = hash_password(password).await?;

        let identity = {
            let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
            // Another client may have registered the email while we hashed.
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailInUse);
            }
            let account = Account {
                uid: Uuid::new_v4().to_string(),
                email: email.clone(),
                display_name: None,
                password_hash,
            };
            let identity = account.identity();
            accounts.insert(email, account);
            identity
        };

        self.lock().set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
        let (identity, password_hash) = {
            let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
            let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
            (account.identity(), account.password_hash.clone())
        };
        if !verify_password(password, &password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        self.lock().set_current(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.lock().set_current(None);
        Ok(())
    }

    async fn update_display_name(&self, name: &str) -> Result<Identity, AuthError> {
        let mut inner = self.lock();
        let current = inner.current.clone().ok_or(AuthError::NotSignedIn)?;

        let identity = {
            let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
            let account = accounts.get_mut(&current.email).ok_or(AuthError::NotSignedIn)?;
            account.display_name = Some(name.trim().to_owned());
            account.identity()
        };

        inner.set_current(Some(identity.clone()));
        Ok(identity)
    }

    fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_subscriber;
        inner.next_subscriber += 1;

        let initial = match &inner.current {
            Some(identity) => AuthEvent::SignedIn(identity.clone()),
            None => AuthEvent::SignedOut,
        };
        let _ = tx.send(initial);
        inner.subscribers.insert(id, tx);

        let weak: Weak<Mutex<ClientInner>> = Arc::downgrade(&self.inner);
        AuthSubscription::new(rx, move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .subscribers
                    .remove(&id);
            }
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Argon2id PHC string with a fresh random salt.
async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| AuthError::Unavailable(format!("password hashing task failed: {e}")))?
    .map_err(|e| AuthError::Unavailable(format!("password hashing failed: {e}")))
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&password_hash)?;
        Ok::<_, argon2::password_hash::Error>(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| AuthError::Unavailable(format!("password verification task failed: {e}")))?
    .map_err(|e| AuthError::Unavailable(format!("stored password hash unreadable: {e}")))
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
