//! Member-area services over the document store.
//!
//! ARCHITECTURE
//! ============
//! Each service maps raw documents to display shapes and stamps records with
//! the caller's identity. Route handlers stay focused on extraction, auth
//! plumbing and status mapping.

pub mod feed;
pub mod format;
pub mod message;
pub mod notification;
pub mod profile;
pub mod report;

use crate::session::Identity;
use crate::store::StoreError;

pub use feed::FeedService;
pub use message::MessageService;
pub use notification::NotificationService;
pub use profile::ProfileService;

/// Longest accepted post or message body, in characters.
pub const MAX_BODY_CHARS: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Name shown for `identity` when no profile overrides it.
#[must_use]
pub fn display_name_of(identity: &Identity) -> String {
    identity
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .or_else(|| identity.email.split('@').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("member")
        .to_owned()
}

/// Trim and bound a user-supplied body.
pub(crate) fn validate_body(body: &str) -> Result<String, ServiceError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(ServiceError::Invalid("body must not be empty".into()));
    }
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(ServiceError::Invalid(format!("body exceeds {MAX_BODY_CHARS} characters")));
    }
    Ok(body.to_owned())
}
