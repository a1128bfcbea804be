//! Edge route guard for member and admin paths.
//!
//! SYSTEM CONTEXT
//! ==============
//! Installed as the outermost middleware on the router, so every request is
//! classified before any handler or page renders. The decision itself is the
//! pure [`decide`] function; the middleware only reads the two signed cookies
//! and turns a redirect decision into a `307`.
//!
//! FAILURE MODEL
//! =============
//! Fail-closed. A cookie that is missing, carries an unexpected value, or
//! fails signature verification reads as "not logged in" / "not admin".
//! Nothing here ever surfaces an error to the client.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use tracing::debug;

use crate::state::AppState;

pub const LOGGED_IN_COOKIE: &str = "logged_in";
pub const ROLE_COOKIE: &str = "role";

pub const SIGNIN_PATH: &str = "/signin";
/// Landing page for authenticated members who lack a privilege.
pub const SAFE_DEFAULT_PATH: &str = "/member/timeline";

const MEMBER_PREFIX: &str = "/member";
const ADMIN_PREFIX: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    NotLoggedIn,
    NotAdmin,
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect { target: String, reason: RedirectReason },
}

impl RouteDecision {
    fn to_signin(path: &str) -> Self {
        Self::Redirect { target: signin_redirect_target(path), reason: RedirectReason::NotLoggedIn }
    }

    fn to_safe_default() -> Self {
        Self::Redirect { target: SAFE_DEFAULT_PATH.to_owned(), reason: RedirectReason::NotAdmin }
    }
}

/// Classify a request from its path and raw cookie values.
///
/// Admin paths check login first, so an anonymous visitor to `/admin/...`
/// is always sent to sign-in rather than the member default page.
#[must_use]
pub fn decide(path: &str, logged_in: Option<&str>, role: Option<&str>) -> RouteDecision {
    let is_member = has_prefix(path, MEMBER_PREFIX);
    let is_admin = has_prefix(path, ADMIN_PREFIX);
    if !is_member && !is_admin {
        return RouteDecision::Allow;
    }

    if logged_in != Some("true") {
        return RouteDecision::to_signin(path);
    }

    if is_admin && role != Some("admin") {
        return RouteDecision::to_safe_default();
    }

    RouteDecision::Allow
}

/// Segment-aware prefix match: `/member` and `/member/x` match, `/membership` does not.
fn has_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

#[must_use]
pub fn signin_redirect_target(path: &str) -> String {
    format!("{SIGNIN_PATH}?next={}", encode_next(path))
}

/// Percent-encode a path for use as the `next` query value, keeping `/` literal.
pub(crate) fn encode_next(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve a post-sign-in return path, refusing anything that is not a
/// same-origin absolute path.
#[must_use]
pub fn sanitize_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => SAFE_DEFAULT_PATH,
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Axum middleware applying [`decide`] to every request.
pub async fn route_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let jar = SignedCookieJar::from_headers(request.headers(), state.cookie_key.clone());
    let logged_in = jar.get(LOGGED_IN_COOKIE);
    let role = jar.get(ROLE_COOKIE);

    let path = request.uri().path().to_owned();
    match decide(&path, logged_in.as_ref().map(Cookie::value), role.as_ref().map(Cookie::value)) {
        RouteDecision::Allow => next.run(request).await,
        RouteDecision::Redirect { target, reason } => {
            debug!(%path, ?reason, %target, "route guard redirect");
            Redirect::temporary(&target).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
