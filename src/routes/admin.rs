//! Admin routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use time::OffsetDateTime;

use super::auth::MemberSession;
use super::service_error_response;
use crate::services::profile::Role;
use crate::services::report::{ClubReport, club_report};
use crate::state::AppState;

/// `GET /admin/reports` - club activity counts.
///
/// The guard admits this path only with a signed `role=admin` cookie; the
/// profile role is checked again so a demoted admin loses access before the
/// cookie is reissued.
pub async fn reports(State(state): State<AppState>, member: MemberSession) -> Result<Json<ClubReport>, Response> {
    let role = state
        .profiles
        .role_of(&member.identity)
        .await
        .map_err(service_error_response)?;
    if role != Role::Admin {
        tracing::warn!(uid = %member.identity.uid, "admin report refused for non-admin profile");
        return Err(StatusCode::FORBIDDEN.into_response());
    }

    let report = club_report(&state.profiles, &state.feed, &state.messages, OffsetDateTime::now_utc())
        .await
        .map_err(service_error_response)?;
    Ok(Json(report))
}
