//! Direct messages between members.
//!
//! DESIGN
//! ======
//! Messages are flat records with `from_uid`, `to_uid` and a `read` flag. A
//! conversation is every message between an unordered pair of members;
//! participant names are resolved from profiles at read time so renames
//! show up in old threads.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use time::OffsetDateTime;

use super::format::{iso_timestamp, relative_time};
use super::notification::{NotificationKind, NotificationService};
use super::profile::ProfileService;
use super::{ServiceError, validate_body};
use crate::session::Identity;
use crate::store::{Document, DocumentStore, FieldDelta, Fields, Order, collect_ordered};

pub const MESSAGES: &str = "messages";

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub from_uid: String,
    pub to_uid: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
    pub sent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationView {
    pub participant_uid: String,
    pub participant_name: String,
    pub last_message: String,
    pub last_sent: String,
    pub unread: usize,
}

struct StoredMessage<'a> {
    doc: &'a Document,
    from: &'a str,
    to: &'a str,
    read: bool,
}

impl<'a> StoredMessage<'a> {
    fn parse(doc: &'a Document) -> Option<Self> {
        Some(Self {
            doc,
            from: doc.str_field("from_uid")?,
            to: doc.str_field("to_uid")?,
            read: doc.bool_field("read").unwrap_or(false),
        })
    }

    fn between(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// The other participant when `uid` took part, else `None`.
    fn counterpart(&self, uid: &str) -> Option<&'a str> {
        if self.from == uid {
            Some(self.to)
        } else if self.to == uid {
            Some(self.from)
        } else {
            None
        }
    }

    fn view(&self, now: OffsetDateTime) -> MessageView {
        MessageView {
            id: self.doc.id.clone(),
            from_uid: self.from.to_owned(),
            to_uid: self.to.to_owned(),
            body: self.doc.str_field("body").unwrap_or_default().to_owned(),
            read: self.read,
            created_at: iso_timestamp(self.doc.created_at),
            sent: relative_time(self.doc.created_at, now),
        }
    }
}

#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn DocumentStore>,
    profiles: ProfileService,
    notifications: NotificationService,
}

impl MessageService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, profiles: ProfileService, notifications: NotificationService) -> Self {
        Self { store, profiles, notifications }
    }

    async fn load(&self, order: &Order) -> Result<Vec<Document>, ServiceError> {
        Ok(collect_ordered(self.store.as_ref(), MESSAGES, order).await?)
    }

    /// Send `body` from `sender` to the member with `to_uid`.
    pub async fn send(&self, sender: &Identity, to_uid: &str, body: &str) -> Result<String, ServiceError> {
        if sender.uid == to_uid {
            return Err(ServiceError::Invalid("cannot message yourself".into()));
        }
        let body = validate_body(body)?;
        self.profiles.require(to_uid).await?;

        let mut fields = Fields::new();
        fields.insert("from_uid".into(), json!(sender.uid));
        fields.insert("to_uid".into(), json!(to_uid));
        fields.insert("body".into(), json!(body));
        fields.insert("read".into(), json!(false));
        let id = self.store.create_record(MESSAGES, fields).await?;

        self.notifications
            .record_best_effort(to_uid, NotificationKind::Message, sender, &sender.uid)
            .await;
        Ok(id)
    }

    /// Messages between `uid` and `other_uid`, oldest first.
    pub async fn thread(&self, uid: &str, other_uid: &str, now: OffsetDateTime) -> Result<Vec<MessageView>, ServiceError> {
        let docs = self.load(&Order::oldest_first()).await?;
        Ok(docs
            .iter()
            .filter_map(StoredMessage::parse)
            .filter(|m| m.between(uid, other_uid))
            .map(|m| m.view(now))
            .collect())
    }

    /// One entry per counterpart, most recent activity first.
    pub async fn conversations(&self, uid: &str, now: OffsetDateTime) -> Result<Vec<ConversationView>, ServiceError> {
        let docs = self.load(&Order::newest_first()).await?;
        let names = self.profiles.display_names().await?;

        let mut order: Vec<&str> = Vec::new();
        let mut by_counterpart: HashMap<&str, ConversationView> = HashMap::new();
        for message in docs.iter().filter_map(StoredMessage::parse) {
            let Some(other) = message.counterpart(uid) else {
                continue;
            };
            let unread = usize::from(message.to == uid && !message.read);
            if let Some(existing) = by_counterpart.get_mut(other) {
                existing.unread += unread;
                continue;
            }
            order.push(other);
            by_counterpart.insert(
                other,
                ConversationView {
                    participant_uid: other.to_owned(),
                    participant_name: names.get(other).cloned().unwrap_or_else(|| "former member".to_owned()),
                    last_message: message.doc.str_field("body").unwrap_or_default().to_owned(),
                    last_sent: relative_time(message.doc.created_at, now),
                    unread,
                },
            );
        }

        Ok(order
            .into_iter()
            .filter_map(|other| by_counterpart.remove(other))
            .collect())
    }

    /// Mark every unread message from `other_uid` to `uid` as read.
    pub async fn mark_thread_read(&self, uid: &str, other_uid: &str) -> Result<usize, ServiceError> {
        let docs = self.load(&Order::oldest_first()).await?;
        let unread: Vec<&str> = docs
            .iter()
            .filter_map(StoredMessage::parse)
            .filter(|m| m.from == other_uid && m.to == uid && !m.read)
            .map(|m| m.doc.id.as_str())
            .collect();
        for id in &unread {
            self.store
                .update_field(MESSAGES, id, "read", FieldDelta::Set(json!(true)))
                .await?;
        }
        Ok(unread.len())
    }

    /// Messages addressed to `uid` that have not been read.
    pub async fn unread_count(&self, uid: &str) -> Result<usize, ServiceError> {
        let docs = self.load(&Order::oldest_first()).await?;
        Ok(docs
            .iter()
            .filter_map(StoredMessage::parse)
            .filter(|m| m.to == uid && !m.read)
            .count())
    }

    pub async fn count(&self) -> Result<usize, ServiceError> {
        Ok(self.load(&Order::oldest_first()).await?.len())
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
