//! Member-area routes. The guard has already checked the routing cookies;
//! handlers resolve the caller through [`MemberSession`] and stamp their
//! identity on every write.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;

use super::auth::MemberSession;
use super::service_error_response;
use crate::services::feed::PostView;
use crate::services::message::{ConversationView, MessageView};
use crate::services::notification::NotificationView;
use crate::services::profile::{Profile, SettingsUpdate};
use crate::state::AppState;

const DEFAULT_TIMELINE_LIMIT: usize = 50;
const MAX_TIMELINE_LIMIT: usize = 200;

#[derive(Deserialize)]
pub struct TimelineQuery {
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct BodyInput {
    pub body: String,
}

/// `GET /member/timeline` - newest posts first.
pub async fn timeline(
    State(state): State<AppState>,
    _member: MemberSession,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Vec<PostView>>, Response> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TIMELINE_LIMIT)
        .clamp(1, MAX_TIMELINE_LIMIT);
    let posts = state
        .feed
        .timeline(OffsetDateTime::now_utc(), limit)
        .await
        .map_err(service_error_response)?;
    Ok(Json(posts))
}

/// `POST /member/posts` - publish a post as the caller.
pub async fn create_post(
    State(state): State<AppState>,
    member: MemberSession,
    Json(input): Json<BodyInput>,
) -> Result<Response, Response> {
    let id = state
        .feed
        .create_post(&member.identity, &input.body)
        .await
        .map_err(service_error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// `GET /member/posts/{id}`
pub async fn post(
    State(state): State<AppState>,
    _member: MemberSession,
    Path(post_id): Path<String>,
) -> Result<Json<PostView>, Response> {
    let post = state
        .feed
        .get_post(&post_id, OffsetDateTime::now_utc())
        .await
        .map_err(service_error_response)?;
    Ok(Json(post))
}

/// `POST /member/posts/{id}/like`
pub async fn like_post(
    State(state): State<AppState>,
    member: MemberSession,
    Path(post_id): Path<String>,
) -> Result<Json<serde_json::Value>, Response> {
    let likes = state
        .feed
        .like_post(&member.identity, &post_id)
        .await
        .map_err(service_error_response)?;
    Ok(Json(json!({ "id": post_id, "likes": likes })))
}

/// `GET /member/profile/{uid}`
pub async fn profile(
    State(state): State<AppState>,
    _member: MemberSession,
    Path(uid): Path<String>,
) -> Result<Json<Profile>, Response> {
    let profile = state
        .profiles
        .require(&uid)
        .await
        .map_err(service_error_response)?;
    Ok(Json(profile))
}

/// `GET /member/messages` - one entry per conversation partner.
pub async fn conversations(
    State(state): State<AppState>,
    member: MemberSession,
) -> Result<Json<Vec<ConversationView>>, Response> {
    let list = state
        .messages
        .conversations(&member.identity.uid, OffsetDateTime::now_utc())
        .await
        .map_err(service_error_response)?;
    Ok(Json(list))
}

/// `GET /member/messages/{uid}` - the thread with `uid`, oldest first.
/// Opening a thread marks the partner's messages read.
pub async fn thread(
    State(state): State<AppState>,
    member: MemberSession,
    Path(other_uid): Path<String>,
) -> Result<Json<Vec<MessageView>>, Response> {
    let uid = &member.identity.uid;
    let messages = state
        .messages
        .thread(uid, &other_uid, OffsetDateTime::now_utc())
        .await
        .map_err(service_error_response)?;
    let marked = state
        .messages
        .mark_thread_read(uid, &other_uid)
        .await
        .map_err(service_error_response)?;
    if marked > 0 {
        tracing::debug!(%uid, %other_uid, marked, "thread marked read");
    }
    Ok(Json(messages))
}

/// `POST /member/messages/{uid}`
pub async fn send_message(
    State(state): State<AppState>,
    member: MemberSession,
    Path(to_uid): Path<String>,
    Json(input): Json<BodyInput>,
) -> Result<Response, Response> {
    let id = state
        .messages
        .send(&member.identity, &to_uid, &input.body)
        .await
        .map_err(service_error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))).into_response())
}

/// `GET /member/messages/unread`
pub async fn unread_count(
    State(state): State<AppState>,
    member: MemberSession,
) -> Result<Json<serde_json::Value>, Response> {
    let unread = state
        .messages
        .unread_count(&member.identity.uid)
        .await
        .map_err(service_error_response)?;
    Ok(Json(json!({ "unread": unread })))
}

/// `GET /member/notifications` - newest first.
pub async fn notifications(
    State(state): State<AppState>,
    member: MemberSession,
) -> Result<Json<Vec<NotificationView>>, Response> {
    let list = state
        .notifications
        .list_for(&member.identity.uid, OffsetDateTime::now_utc())
        .await
        .map_err(service_error_response)?;
    Ok(Json(list))
}

/// `GET /member/settings` - the caller's own profile.
pub async fn settings(State(state): State<AppState>, member: MemberSession) -> Result<Json<Profile>, Response> {
    let profile = state
        .profiles
        .require(&member.identity.uid)
        .await
        .map_err(service_error_response)?;
    Ok(Json(profile))
}

/// `PATCH /member/settings` - update display name and bio. A new display
/// name is also pushed to the auth account, best effort.
pub async fn update_settings(
    State(state): State<AppState>,
    member: MemberSession,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Profile>, Response> {
    let renamed = update.display_name.is_some();
    let profile = state
        .profiles
        .update_settings(&member.identity, update)
        .await
        .map_err(service_error_response)?;

    if renamed {
        if let Err(e) = member.propagator.update_display_name(&profile.display_name).await {
            tracing::warn!(uid = %profile.uid, error = %e, "auth display name update failed");
        }
    }
    Ok(Json(profile))
}
