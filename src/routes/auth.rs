//! Auth routes: sign-up, sign-in, sign-out and the member session extractor.
//!
//! Each browser is identified by a signed `sid` cookie that owns one
//! [`SessionPropagator`] in the registry. A successful sign-in also sets the
//! signed `logged_in` and `role` cookies that the route guard reads.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Form, FromRef, FromRequest, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error_response;
use super::pages::SIGNUP_PATH;
use crate::guard::{LOGGED_IN_COOKIE, ROLE_COOKIE, SIGNIN_PATH, sanitize_next};
use crate::services::profile::Role;
use crate::session::{AuthError, AuthOperationState, Identity, SessionPropagator, SessionStatus, SignUp};
use crate::state::AppState;

pub const SID_COOKIE: &str = "sid";

/// How long a handler waits for the session mirror to catch up with a
/// completed sign-in before answering.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn auth_error_to_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail | AuthError::WeakPassword { .. } => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
        AuthError::EmailInUse => StatusCode::CONFLICT,
        AuthError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        AuthError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

fn auth_error_response(err: &AuthError) -> Response {
    error_response(auth_error_to_status(err), err.to_string())
}

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(name: &'static str, value: impl Into<String>, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value.into()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::ZERO)
        .build()
}

fn sid_from(jar: &SignedCookieJar) -> Option<String> {
    jar.get(SID_COOKIE).map(|cookie| cookie.value().to_owned())
}

// =============================================================================
// MEMBER EXTRACTOR
// =============================================================================

/// Signed-in caller resolved from the `sid` cookie.
/// Use as a handler parameter to require an authenticated session.
pub struct MemberSession {
    pub identity: Identity,
    pub propagator: Arc<SessionPropagator>,
}

impl<S> FromRequestParts<S> for MemberSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let jar = SignedCookieJar::from_headers(&parts.headers, app_state.cookie_key.clone());
        let sid = sid_from(&jar).ok_or(StatusCode::UNAUTHORIZED)?;
        let propagator = app_state
            .sessions
            .get(&sid)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;
        let mut session = propagator.session().snapshot();
        if session.status() == SessionStatus::Loading {
            session = tokio::time::timeout(SETTLE_TIMEOUT, propagator.session().wait_for(|s| !s.is_loading))
                .await
                .unwrap_or(session);
        }
        let identity = session.identity.ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(Self { identity, propagator })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Request body accepted as JSON from scripts or as a url-encoded form from
/// the sign-in and sign-up pages. Form posts are answered with redirects.
pub struct Submission<T> {
    pub body: T,
    pub form: bool,
}

impl<S, T> FromRequest<S> for Submission<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE));
        if form {
            let Form(body) = Form::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self { body, form: true })
        } else {
            let Json(body) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Self { body, form: false })
        }
    }
}

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Deserialize)]
pub struct SignUpBody {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInBody {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Identity,
    pub role: Role,
    /// Where the browser should go next.
    pub redirect: String,
}

/// `POST /api/auth/signup` - create the account, then sign the browser in.
pub async fn signup(State(state): State<AppState>, jar: SignedCookieJar, submission: Submission<SignUpBody>) -> Response {
    let Submission { body, form } = submission;
    let existing = sid_from(&jar);
    let (sid, propagator) = state.sessions.open(existing.as_deref()).await;
    let request = SignUp { email: body.email, password: body.password, display_name: body.display_name };
    match propagator.sign_up(request).await {
        Ok(identity) => {
            let (jar, session) = signed_in(&state, jar, &sid, &propagator, identity, None).await;
            if form {
                (jar, Redirect::to(&session.redirect)).into_response()
            } else {
                (StatusCode::CREATED, jar, Json(session)).into_response()
            }
        }
        Err(e) => {
            discard_fresh_session(&state, existing.as_deref(), &sid).await;
            if form {
                Redirect::to(&page_with_error(SIGNUP_PATH, &e, None)).into_response()
            } else {
                auth_error_response(&e)
            }
        }
    }
}

/// `POST /api/auth/signin` - sign in and set the routing cookies.
pub async fn signin(State(state): State<AppState>, jar: SignedCookieJar, submission: Submission<SignInBody>) -> Response {
    let Submission { body, form } = submission;
    let existing = sid_from(&jar);
    let (sid, propagator) = state.sessions.open(existing.as_deref()).await;
    match propagator.sign_in(&body.email, &body.password).await {
        Ok(identity) => {
            let (jar, session) = signed_in(&state, jar, &sid, &propagator, identity, body.next.as_deref()).await;
            if form {
                (jar, Redirect::to(&session.redirect)).into_response()
            } else {
                (jar, Json(session)).into_response()
            }
        }
        Err(e) => {
            discard_fresh_session(&state, existing.as_deref(), &sid).await;
            if form {
                Redirect::to(&page_with_error(SIGNIN_PATH, &e, body.next.as_deref())).into_response()
            } else {
                auth_error_response(&e)
            }
        }
    }
}

/// Tear down a session that this request mounted when the auth call behind
/// it failed. A session the browser already owned is left alone.
async fn discard_fresh_session(state: &AppState, existing: Option<&str>, sid: &str) {
    if existing != Some(sid) {
        state.sessions.close(sid).await;
    }
}

/// `/signin?error=..&next=..` for a failed form post.
pub(crate) fn page_with_error(page: &str, err: &AuthError, next: Option<&str>) -> String {
    let mut target = format!("{page}?error={}", urlencoding::encode(&err.to_string()));
    if let Some(next) = next.filter(|next| !next.is_empty()) {
        target.push_str("&next=");
        target.push_str(&urlencoding::encode(next));
    }
    target
}

async fn signed_in(
    state: &AppState,
    jar: SignedCookieJar,
    sid: &str,
    propagator: &SessionPropagator,
    identity: Identity,
    next: Option<&str>,
) -> (SignedCookieJar, SessionResponse) {
    let settled = tokio::time::timeout(
        SETTLE_TIMEOUT,
        propagator
            .session()
            .wait_for(|session| session.identity.as_ref() == Some(&identity)),
    )
    .await;
    if settled.is_err() {
        tracing::warn!(uid = %identity.uid, "session mirror did not settle after sign-in");
    }

    let role = match state.profiles.role_of(&identity).await {
        Ok(role) => role,
        Err(e) => {
            tracing::warn!(uid = %identity.uid, error = %e, "profile lookup failed; using email role");
            state.profiles.role_for_email(&identity.email)
        }
    };
    tracing::info!(uid = %identity.uid, role = role.as_str(), "signed in");

    let secure = state.config.cookie_secure;
    let jar = jar
        .add(session_cookie(SID_COOKIE, sid, secure))
        .add(session_cookie(LOGGED_IN_COOKIE, "true", secure))
        .add(session_cookie(ROLE_COOKIE, role.as_str(), secure));
    let redirect = sanitize_next(next).to_owned();
    (jar, SessionResponse { user: identity, role, redirect })
}

/// `POST /api/auth/signout` - sign out, drop the browser session, clear cookies.
pub async fn signout(State(state): State<AppState>, jar: SignedCookieJar) -> Response {
    if let Some(sid) = sid_from(&jar) {
        if let Some(propagator) = state.sessions.get(&sid).await {
            if let Err(e) = propagator.sign_out().await {
                tracing::warn!(error = %e, "sign-out failed; clearing browser session anyway");
            }
        }
        state.sessions.close(&sid).await;
    }

    let secure = state.config.cookie_secure;
    let jar = jar
        .add(expired_cookie(SID_COOKIE, secure))
        .add(expired_cookie(LOGGED_IN_COOKIE, secure))
        .add(expired_cookie(ROLE_COOKIE, secure));
    (jar, StatusCode::NO_CONTENT).into_response()
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Identity,
    pub role: Role,
    pub operation: AuthOperationState,
}

/// `GET /api/auth/me` - the caller's identity, role and auth operation state.
pub async fn me(State(state): State<AppState>, member: MemberSession) -> Result<Json<MeResponse>, Response> {
    let role = state
        .profiles
        .role_of(&member.identity)
        .await
        .map_err(super::service_error_response)?;
    let operation = member.propagator.operation_state();
    Ok(Json(MeResponse { user: member.identity, role, operation }))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
