use super::*;

// =============================================================================
// auth_error_to_status
// =============================================================================

#[test]
fn auth_error_to_status_maps_rejections() {
    assert_eq!(auth_error_to_status(&AuthError::InvalidEmail), StatusCode::BAD_REQUEST);
    assert_eq!(auth_error_to_status(&AuthError::WeakPassword { min: 6 }), StatusCode::BAD_REQUEST);
    assert_eq!(auth_error_to_status(&AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::NotSignedIn), StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error_to_status(&AuthError::EmailInUse), StatusCode::CONFLICT);
}

#[test]
fn auth_error_to_status_maps_provider_failures() {
    assert_eq!(auth_error_to_status(&AuthError::Timeout(Duration::from_millis(50))), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(auth_error_to_status(&AuthError::Unavailable("down".into())), StatusCode::BAD_GATEWAY);
}

// =============================================================================
// cookies
// =============================================================================

#[test]
fn session_cookie_attributes() {
    let cookie = session_cookie(LOGGED_IN_COOKIE, "true", true);
    assert_eq!(cookie.value(), "true");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.secure(), Some(true));
}

#[test]
fn session_cookie_secure_follows_config() {
    assert_eq!(session_cookie(ROLE_COOKIE, "member", false).secure(), Some(false));
}

#[test]
fn expired_cookie_has_zero_max_age() {
    let cookie = expired_cookie(SID_COOKIE, false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
}

// =============================================================================
// handlers
// =============================================================================

fn json<T>(body: T) -> Submission<T> {
    Submission { body, form: false }
}

fn form<T>(body: T) -> Submission<T> {
    Submission { body, form: true }
}

fn location(resp: &Response) -> &str {
    resp.headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn signin_with_wrong_password_is_unauthorized() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = SignUpBody { email: "ada@club.edu".into(), password: "hunter22".into(), display_name: None };
    let resp = signup(State(state.clone()), jar.clone(), json(body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = SignInBody { email: "ada@club.edu".into(), password: "wrong-pass".into(), next: None };
    let resp = signin(State(state.clone()), jar, json(body)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["error"], "incorrect email or password");
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = || SignUpBody { email: "ada@club.edu".into(), password: "hunter22".into(), display_name: None };

    assert_eq!(signup(State(state.clone()), jar.clone(), json(body())).await.status(), StatusCode::CREATED);
    assert_eq!(signup(State(state.clone()), jar, json(body())).await.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_without_name_uses_email_local_part() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = SignUpBody { email: "grace@club.edu".into(), password: "hunter22".into(), display_name: None };
    let resp = signup(State(state.clone()), jar, json(body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let profiles = state.profiles.all().await.unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].display_name, "grace");
}

#[tokio::test]
async fn signout_without_session_still_clears_cookies() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let resp = signout(State(state), jar).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers().get_all(axum::http::header::SET_COOKIE).iter().count(), 3);
}

#[tokio::test]
async fn failed_signin_does_not_keep_a_fresh_session() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = SignInBody { email: "nobody@club.edu".into(), password: "whatever".into(), next: None };
    let resp = signin(State(state.clone()), jar, json(body)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(state.sessions.is_empty().await);
}

#[tokio::test]
async fn failed_signin_keeps_the_browsers_existing_session() {
    let state = crate::state::test_helpers::test_app_state();
    let (sid, _) = state.sessions.open(None).await;
    let jar = SignedCookieJar::new(state.cookie_key.clone()).add(Cookie::new(SID_COOKIE, sid.clone()));
    let body = SignInBody { email: "nobody@club.edu".into(), password: "whatever".into(), next: None };
    let resp = signin(State(state.clone()), jar, json(body)).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(state.sessions.get(&sid).await.is_some());
    assert_eq!(state.sessions.len().await, 1);
}

#[tokio::test]
async fn weak_password_signup_does_not_keep_a_fresh_session() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = SignUpBody { email: "ada@club.edu".into(), password: "abc".into(), display_name: None };
    let resp = signup(State(state.clone()), jar, json(body)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(state.sessions.is_empty().await);
}

#[tokio::test]
async fn form_signup_redirects_to_timeline() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = SignUpBody { email: "ada@club.edu".into(), password: "hunter22".into(), display_name: Some(String::new()) };
    let resp = signup(State(state.clone()), jar, form(body)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/member/timeline");
    assert_eq!(resp.headers().get_all(axum::http::header::SET_COOKIE).iter().count(), 3);
}

#[tokio::test]
async fn form_signin_failure_returns_to_signin_page_with_error() {
    let state = crate::state::test_helpers::test_app_state();
    let jar = SignedCookieJar::new(state.cookie_key.clone());
    let body = SignInBody {
        email: "nobody@club.edu".into(),
        password: "whatever".into(),
        next: Some("/member/messages".into()),
    };
    let resp = signin(State(state.clone()), jar, form(body)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/signin?error=incorrect%20email%20or%20password&next=%2Fmember%2Fmessages");
    assert!(state.sessions.is_empty().await);
}

#[test]
fn page_with_error_omits_empty_next() {
    assert_eq!(
        page_with_error("/signup", &AuthError::EmailInUse, Some("")),
        "/signup?error=an%20account%20already%20exists%20for%20this%20email"
    );
}
