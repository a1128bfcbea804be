use super::*;

// =============================================================================
// normalize_email
// =============================================================================

#[test]
fn normalize_email_lowercases_and_trims() {
    assert_eq!(normalize_email("  Ada@Club.EDU "), Some("ada@club.edu".into()));
}

#[test]
fn normalize_email_rejects_malformed() {
    for raw in ["", "ada", "@club.edu", "ada@", "a@b@c"] {
        assert_eq!(normalize_email(raw), None, "input {raw:?}");
    }
}

// =============================================================================
// password hashing
// =============================================================================

#[tokio::test]
async fn hash_password_is_argon2id_phc_string() {
    let hash = hash_password("hunter22").await.unwrap();
    assert!(hash.starts_with("$argon2id$"), "got {hash}");
    assert!(!hash.contains("hunter22"));
}

#[tokio::test]
async fn verify_password_accepts_only_the_original() {
    let hash = hash_password("hunter22").await.unwrap();
    assert!(verify_password("hunter22", &hash).await.unwrap());
    assert!(!verify_password("hunter23", &hash).await.unwrap());
}

#[tokio::test]
async fn same_password_hashes_differently() {
    let a = hash_password("hunter22").await.unwrap();
    let b = hash_password("hunter22").await.unwrap();
    assert_ne!(a, b);
    assert!(verify_password("hunter22", &b).await.unwrap());
}

#[tokio::test]
async fn corrupt_stored_hash_is_reported_as_unavailable() {
    let err = verify_password("hunter22", "not-a-phc-string").await.unwrap_err();
    assert!(matches!(err, AuthError::Unavailable(_)));
}

// =============================================================================
// accounts
// =============================================================================

#[tokio::test]
async fn create_account_then_sign_in_from_another_client() {
    let backend = MemoryAuthBackend::new();
    let created = backend.client().create_account("ada@club.edu", "hunter22").await.unwrap();

    let other = backend.client();
    let signed_in = other.sign_in("ADA@club.edu", "hunter22").await.unwrap();
    assert_eq!(signed_in.uid, created.uid);
    assert_eq!(backend.account_count(), 1);
}

#[tokio::test]
async fn create_account_rejects_duplicate_email() {
    let backend = MemoryAuthBackend::new();
    backend.client().create_account("ada@club.edu", "hunter22").await.unwrap();
    let err = backend.client().create_account("ada@club.edu", "another1").await.unwrap_err();
    assert_eq!(err, AuthError::EmailInUse);
}

#[tokio::test]
async fn create_account_rejects_short_password() {
    let backend = MemoryAuthBackend::new();
    let err = backend.client().create_account("ada@club.edu", "abc").await.unwrap_err();
    assert_eq!(err, AuthError::WeakPassword { min: MIN_PASSWORD_LEN });
    assert_eq!(backend.account_count(), 0);
}

#[tokio::test]
async fn sign_in_wrong_password_is_invalid_credentials() {
    let backend = MemoryAuthBackend::new();
    backend.client().create_account("ada@club.edu", "hunter22").await.unwrap();
    let err = backend.client().sign_in("ada@club.edu", "hunter23").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);
}

#[tokio::test]
async fn sign_in_unknown_email_is_invalid_credentials() {
    let backend = MemoryAuthBackend::new();
    let err = backend.client().sign_in("nobody@club.edu", "hunter22").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);
}

#[tokio::test]
async fn update_display_name_requires_sign_in() {
    let backend = MemoryAuthBackend::new();
    let err = backend.client().update_display_name("Ada").await.unwrap_err();
    assert_eq!(err, AuthError::NotSignedIn);
}

// =============================================================================
// subscriptions
// =============================================================================

#[tokio::test]
async fn subscribe_delivers_current_state_then_changes_in_order() {
    let backend = MemoryAuthBackend::new();
    let client = backend.client();
    let mut sub = client.subscribe();

    assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));

    let identity = client.create_account("ada@club.edu", "hunter22").await.unwrap();
    let renamed = client.update_display_name(" Ada ").await.unwrap();
    client.sign_out().await.unwrap();

    assert_eq!(sub.next().await, Some(AuthEvent::SignedIn(identity)));
    assert_eq!(renamed.display_name.as_deref(), Some("Ada"));
    assert_eq!(sub.next().await, Some(AuthEvent::SignedIn(renamed)));
    assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));
}

#[tokio::test]
async fn failed_call_emits_nothing() {
    let backend = MemoryAuthBackend::new();
    let client = backend.client();
    let mut sub = client.subscribe();
    assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));

    let _ = client.sign_in("ada@club.edu", "hunter22").await;
    client.sign_out().await.unwrap();
    // The only queued event is the explicit sign-out.
    assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));
}

#[tokio::test]
async fn unsubscribe_and_drop_detach_listener() {
    let backend = MemoryAuthBackend::new();
    let client = backend.client();

    let a = client.subscribe();
    let b = client.subscribe();
    assert_eq!(client.subscriber_count(), 2);

    a.unsubscribe();
    assert_eq!(client.subscriber_count(), 1);

    drop(b);
    assert_eq!(client.subscriber_count(), 0);
}

#[tokio::test]
async fn clients_do_not_share_signed_in_state() {
    let backend = MemoryAuthBackend::new();
    let first = backend.client();
    first.create_account("ada@club.edu", "hunter22").await.unwrap();

    let second = backend.client();
    let mut sub = second.subscribe();
    assert_eq!(sub.next().await, Some(AuthEvent::SignedOut));
}
