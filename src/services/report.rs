//! Club activity report for administrators.

use serde::Serialize;
use time::OffsetDateTime;

use super::format::iso_timestamp;
use super::profile::Role;
use super::{FeedService, MessageService, ProfileService, ServiceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClubReport {
    pub members: usize,
    pub admins: usize,
    pub posts: usize,
    pub messages: usize,
    pub generated_at: String,
}

/// Headline counts for the admin dashboard.
pub async fn club_report(
    profiles: &ProfileService,
    feed: &FeedService,
    messages: &MessageService,
    now: OffsetDateTime,
) -> Result<ClubReport, ServiceError> {
    let all = profiles.all().await?;
    let admins = all.iter().filter(|p| p.role == Role::Admin).count();
    Ok(ClubReport {
        members: all.len(),
        admins,
        posts: feed.count().await?,
        messages: messages.count().await?,
        generated_at: iso_timestamp(now),
    })
}
