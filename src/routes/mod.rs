//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the public pages, the auth API, the member area and the admin area
//! under a single Axum router. The route guard wraps the whole router, so
//! `/member/*` and `/admin/*` requests are classified from their cookies
//! before any handler here runs.

pub mod admin;
pub mod auth;
pub mod member;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde_json::json;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::guard::route_guard;
use crate::services::ServiceError;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(pages::landing))
        .route("/signin", get(pages::signin))
        .route("/signup", get(pages::signup))
        .route("/healthz", get(healthz))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/signout", post(auth::signout))
        .route("/api/auth/me", get(auth::me))
        .route("/member/timeline", get(member::timeline))
        .route("/member/posts", post(member::create_post))
        .route("/member/posts/{id}", get(member::post))
        .route("/member/posts/{id}/like", post(member::like_post))
        .route("/member/profile/{uid}", get(member::profile))
        .route("/member/messages", get(member::conversations))
        .route("/member/messages/unread", get(member::unread_count))
        .route("/member/messages/{uid}", get(member::thread).post(member::send_message))
        .route("/member/notifications", get(member::notifications))
        .route("/member/settings", get(member::settings).patch(member::update_settings))
        .route("/admin/reports", get(admin::reports))
        .layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// `{ "error": message }` with the given status.
pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

pub(crate) fn service_error_to_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a service failure to a JSON error. Store failures are logged and
/// reported without detail.
pub(crate) fn service_error_response(err: ServiceError) -> Response {
    let status = service_error_to_status(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "service call failed");
        return error_response(status, "internal error");
    }
    error_response(status, err.to_string())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
