//! Notifications for likes and direct messages.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use super::format::{iso_timestamp, relative_time};
use super::{ServiceError, display_name_of};
use crate::session::Identity;
use crate::store::{Document, DocumentStore, Fields, Order, collect_where};

pub const NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Message,
}

impl NotificationKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Message => "message",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "like" => Some(Self::Like),
            "message" => Some(Self::Message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: String,
    pub kind: NotificationKind,
    pub actor_uid: String,
    pub actor_name: String,
    /// Post id for likes, sender uid for messages.
    pub target_id: String,
    pub created_at: String,
    pub when: String,
}

impl NotificationView {
    fn from_document(doc: &Document, now: OffsetDateTime) -> Option<Self> {
        Some(Self {
            id: doc.id.clone(),
            kind: NotificationKind::parse(doc.str_field("kind")?)?,
            actor_uid: doc.str_field("actor_uid").unwrap_or_default().to_owned(),
            actor_name: doc.str_field("actor_name").unwrap_or_default().to_owned(),
            target_id: doc.str_field("target_id").unwrap_or_default().to_owned(),
            created_at: iso_timestamp(doc.created_at),
            when: relative_time(doc.created_at, now),
        })
    }
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
}

impl NotificationService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        recipient_uid: &str,
        kind: NotificationKind,
        actor: &Identity,
        target_id: &str,
    ) -> Result<String, ServiceError> {
        let mut fields = Fields::new();
        fields.insert("recipient_uid".into(), json!(recipient_uid));
        fields.insert("kind".into(), json!(kind.as_str()));
        fields.insert("actor_uid".into(), json!(actor.uid));
        fields.insert("actor_name".into(), json!(display_name_of(actor)));
        fields.insert("target_id".into(), json!(target_id));
        Ok(self.store.create_record(NOTIFICATIONS, fields).await?)
    }

    /// Record a notification, logging instead of failing the triggering action.
    pub(crate) async fn record_best_effort(
        &self,
        recipient_uid: &str,
        kind: NotificationKind,
        actor: &Identity,
        target_id: &str,
    ) {
        if let Err(e) = self.record(recipient_uid, kind, actor, target_id).await {
            tracing::warn!(recipient = %recipient_uid, kind = kind.as_str(), error = %e, "notification write failed");
        }
    }

    /// Notifications addressed to `uid`, newest first.
    pub async fn list_for(&self, uid: &str, now: OffsetDateTime) -> Result<Vec<NotificationView>, ServiceError> {
        let docs = collect_where(
            self.store.as_ref(),
            NOTIFICATIONS,
            "recipient_uid",
            &json!(uid),
            &Order::newest_first(),
        )
        .await?;
        Ok(docs
            .iter()
            .filter_map(|doc| NotificationView::from_document(doc, now))
            .collect())
    }
}
