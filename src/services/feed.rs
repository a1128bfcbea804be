//! Timeline posts and likes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use super::format::{iso_timestamp, relative_time};
use super::notification::{NotificationKind, NotificationService};
use super::{ServiceError, display_name_of, validate_body};
use crate::session::Identity;
use crate::store::{Document, DocumentStore, FieldDelta, Fields, Order, collect_ordered};

pub const POSTS: &str = "posts";

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub author_uid: String,
    pub author_name: String,
    pub body: String,
    pub likes: i64,
    pub created_at: String,
    pub posted: String,
}

impl PostView {
    fn from_document(doc: &Document, now: OffsetDateTime) -> Self {
        Self {
            id: doc.id.clone(),
            author_uid: doc.str_field("author_uid").unwrap_or_default().to_owned(),
            author_name: doc.str_field("author_name").unwrap_or_default().to_owned(),
            body: doc.str_field("body").unwrap_or_default().to_owned(),
            likes: doc.i64_field("likes").unwrap_or(0),
            created_at: iso_timestamp(doc.created_at),
            posted: relative_time(doc.created_at, now),
        }
    }
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn DocumentStore>,
    notifications: NotificationService,
}

impl FeedService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, notifications: NotificationService) -> Self {
        Self { store, notifications }
    }

    /// Publish a post stamped with `author`'s identity.
    pub async fn create_post(&self, author: &Identity, body: &str) -> Result<String, ServiceError> {
        let body = validate_body(body)?;
        let mut fields = Fields::new();
        fields.insert("author_uid".into(), json!(author.uid));
        fields.insert("author_name".into(), json!(display_name_of(author)));
        fields.insert("body".into(), json!(body));
        fields.insert("likes".into(), json!(0));
        let id = self.store.create_record(POSTS, fields).await?;
        tracing::info!(post_id = %id, author = %author.uid, "post created");
        Ok(id)
    }

    /// Up to `limit` posts, newest first.
    pub async fn timeline(&self, now: OffsetDateTime, limit: usize) -> Result<Vec<PostView>, ServiceError> {
        let docs = collect_ordered(self.store.as_ref(), POSTS, &Order::newest_first()).await?;
        Ok(docs
            .iter()
            .take(limit)
            .map(|doc| PostView::from_document(doc, now))
            .collect())
    }

    pub async fn get_post(&self, post_id: &str, now: OffsetDateTime) -> Result<PostView, ServiceError> {
        let doc = self
            .store
            .get_record(POSTS, post_id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?;
        Ok(PostView::from_document(&doc, now))
    }

    /// Increment the like counter and notify the author (never for self-likes).
    /// Returns the updated count.
    pub async fn like_post(&self, liker: &Identity, post_id: &str) -> Result<i64, ServiceError> {
        let doc = self
            .store
            .get_record(POSTS, post_id)
            .await?
            .ok_or(ServiceError::NotFound("post"))?;
        self.store
            .update_field(POSTS, post_id, "likes", FieldDelta::Increment(1))
            .await?;

        if let Some(author_uid) = doc.str_field("author_uid").filter(|uid| *uid != liker.uid) {
            self.notifications
                .record_best_effort(author_uid, NotificationKind::Like, liker, post_id)
                .await;
        }

        let updated = self.store.get_record(POSTS, post_id).await?;
        Ok(updated.and_then(|d| d.i64_field("likes")).unwrap_or(0))
    }

    pub async fn count(&self) -> Result<usize, ServiceError> {
        let docs = collect_ordered(self.store.as_ref(), POSTS, &Order::oldest_first()).await?;
        Ok(docs.len())
    }
}
