//! Document store seam.
//!
//! ARCHITECTURE
//! ============
//! The hosted platform's document database is reached through
//! [`DocumentStore`]: schemaless records grouped by collection, each with a
//! generated id and a creation timestamp. `memory` backs development and
//! tests; `postgres` keeps records in a single `jsonb` table.

pub mod memory;
pub mod postgres;

use std::cmp::Ordering;

use futures::TryStreamExt;
use futures::stream::BoxStream;
use serde_json::Value;
use time::OffsetDateTime;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

pub type Fields = serde_json::Map<String, Value>;
pub type RecordStream = BoxStream<'static, Result<Document, StoreError>>;

/// Pseudo-field naming the record's creation timestamp in an [`Order`].
pub const CREATED_AT: &str = "created_at";

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub fields: Fields,
    pub created_at: OffsetDateTime,
}

impl Document {
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn i64_field(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn bool_field(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    #[must_use]
    pub fn by(field: &str, direction: Direction) -> Self {
        Self { field: field.to_owned(), direction }
    }

    #[must_use]
    pub fn newest_first() -> Self {
        Self::by(CREATED_AT, Direction::Descending)
    }

    #[must_use]
    pub fn oldest_first() -> Self {
        Self::by(CREATED_AT, Direction::Ascending)
    }
}

/// Change applied to one field by [`DocumentStore::update_field`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDelta {
    /// Add to an integer field; a missing field counts as 0.
    Increment(i64),
    Set(Value),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },
    #[error("field `{field}` is not an integer")]
    NotNumeric { field: String },
    #[error("field `{field}` would overflow a 64-bit integer")]
    Overflow { field: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a record and return its generated id.
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    async fn get_record(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Stream every record in `collection` sorted by `order`. Ties keep
    /// insertion order, reversed for descending sorts.
    async fn query_ordered(&self, collection: &str, order: &Order) -> Result<RecordStream, StoreError>;

    /// Like [`DocumentStore::query_ordered`], restricted to records whose
    /// `field` equals `value`.
    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        order: &Order,
    ) -> Result<RecordStream, StoreError>;

    async fn update_field(&self, collection: &str, id: &str, field: &str, delta: FieldDelta) -> Result<(), StoreError>;
}

/// Drain [`DocumentStore::query_ordered`] into a vector.
pub async fn collect_ordered(
    store: &dyn DocumentStore,
    collection: &str,
    order: &Order,
) -> Result<Vec<Document>, StoreError> {
    store.query_ordered(collection, order).await?.try_collect().await
}

/// Drain [`DocumentStore::query_where`] into a vector.
pub async fn collect_where(
    store: &dyn DocumentStore,
    collection: &str,
    field: &str,
    value: &Value,
    order: &Order,
) -> Result<Vec<Document>, StoreError> {
    store.query_where(collection, field, value, order).await?.try_collect().await
}

/// Total order over JSON values used for field sorts: missing < null < bool <
/// number < string. Arrays and objects compare equal to each other.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(Value::Array(_) | Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
