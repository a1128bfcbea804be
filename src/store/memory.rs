//! In-process document store.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    CREATED_AT, Direction, Document, DocumentStore, FieldDelta, Fields, Order, RecordStream, StoreError,
    compare_values,
};

/// Collections keyed by name; each holds records in insertion order.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn sorted(&self, collection: &str, order: &Order, keep: impl Fn(&Document) -> bool) -> RecordStream {
        let mut docs: Vec<Document> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map(|docs| docs.iter().filter(|&doc| keep(doc)).cloned().collect())
            .unwrap_or_default();

        if order.field == CREATED_AT {
            docs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        } else {
            docs.sort_by(|a, b| compare_values(a.fields.get(&order.field), b.fields.get(&order.field)));
        }
        if order.direction == Direction::Descending {
            docs.reverse();
        }

        Box::pin(futures::stream::iter(docs.into_iter().map(Ok)))
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let doc = Document {
            id: id.clone(),
            collection: collection.to_owned(),
            fields,
            created_at: OffsetDateTime::now_utc(),
        };
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(collection.to_owned())
            .or_default()
            .push(doc);
        Ok(id)
    }

    async fn get_record(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn query_ordered(&self, collection: &str, order: &Order) -> Result<RecordStream, StoreError> {
        Ok(self.sorted(collection, order, |_| true))
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        order: &Order,
    ) -> Result<RecordStream, StoreError> {
        Ok(self.sorted(collection, order, |doc| doc.fields.get(field) == Some(value)))
    }

    async fn update_field(&self, collection: &str, id: &str, field: &str, delta: FieldDelta) -> Result<(), StoreError> {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::NotFound { collection: collection.to_owned(), id: id.to_owned() })?;

        let next = match delta {
            FieldDelta::Set(value) => value,
            FieldDelta::Increment(by) => {
                let current = match doc.fields.get(field) {
                    None | Some(Value::Null) => 0,
                    Some(value) => value
                        .as_i64()
                        .ok_or_else(|| StoreError::NotNumeric { field: field.to_owned() })?,
                };
                let next = current
                    .checked_add(by)
                    .ok_or_else(|| StoreError::Overflow { field: field.to_owned() })?;
                Value::from(next)
            }
        };
        doc.fields.insert(field.to_owned(), next);
        Ok(())
    }
}
