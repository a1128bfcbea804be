//! Postgres-backed document store.
//!
//! DESIGN
//! ======
//! All collections share the `documents` table; fields live in a `jsonb`
//! column. A `BIGSERIAL` sequence breaks `created_at` ties so ordering
//! matches the memory store. Increments run as a single `UPDATE` so
//! concurrent likes never lose writes. Field filters use `@>` containment,
//! served by the GIN index on `fields`.

use futures::StreamExt;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CREATED_AT, Direction, Document, DocumentStore, FieldDelta, Fields, Order, RecordStream, StoreError};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn increment_error(err: sqlx::Error, field: &str) -> StoreError {
    let overflow = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE)
    );
    if overflow {
        StoreError::Overflow { field: field.to_owned() }
    } else {
        StoreError::Database(err)
    }
}

fn rows_to_stream(rows: &[PgRow]) -> Result<RecordStream, StoreError> {
    let docs = rows
        .iter()
        .map(row_to_document)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(futures::stream::iter(docs.into_iter().map(Ok)).boxed())
}

fn row_to_document(row: &PgRow) -> Result<Document, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let fields: Value = row.try_get("fields")?;
    let created_at: OffsetDateTime = row.try_get("created_at")?;
    Ok(Document {
        id: id.to_string(),
        collection: row.try_get("collection")?,
        fields: match fields {
            Value::Object(map) => map,
            _ => Fields::new(),
        },
        created_at,
    })
}

/// Postgres `numeric_value_out_of_range`, raised when `bigint` addition overflows.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// `ORDER BY` for `order`. A field sort binds the JSON key at `$key_param`.
fn order_clause(order: &Order, key_param: usize) -> String {
    let (direction, nulls) = match order.direction {
        Direction::Ascending => ("ASC", "NULLS FIRST"),
        Direction::Descending => ("DESC", "NULLS LAST"),
    };
    if order.field == CREATED_AT {
        format!("ORDER BY created_at {direction}, seq {direction}")
    } else {
        format!("ORDER BY fields -> ${key_param} {direction} {nulls}, seq {direction}")
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_record(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, collection, fields) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(Value::Object(fields))
            .execute(&self.pool)
            .await?;
        Ok(id.to_string())
    }

    async fn get_record(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let row = sqlx::query("SELECT id, collection, fields, created_at FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_document).transpose()?)
    }

    async fn query_ordered(&self, collection: &str, order: &Order) -> Result<RecordStream, StoreError> {
        let sql = format!(
            "SELECT id, collection, fields, created_at FROM documents WHERE collection = $1 {}",
            order_clause(order, 2)
        );
        let mut query = sqlx::query(&sql).bind(collection);
        if order.field != CREATED_AT {
            query = query.bind(order.field.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows_to_stream(&rows)
    }

    async fn query_where(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
        order: &Order,
    ) -> Result<RecordStream, StoreError> {
        let sql = format!(
            "SELECT id, collection, fields, created_at FROM documents \
             WHERE collection = $1 AND fields @> jsonb_build_object($2::text, $3::jsonb) {}",
            order_clause(order, 4)
        );
        let mut query = sqlx::query(&sql).bind(collection).bind(field).bind(value);
        if order.field != CREATED_AT {
            query = query.bind(order.field.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows_to_stream(&rows)
    }

    async fn update_field(&self, collection: &str, id: &str, field: &str, delta: FieldDelta) -> Result<(), StoreError> {
        let not_found = || StoreError::NotFound { collection: collection.to_owned(), id: id.to_owned() };
        let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;

        let result = match delta {
            FieldDelta::Increment(by) => {
                let current = sqlx::query("SELECT fields -> $3 AS value FROM documents WHERE collection = $1 AND id = $2")
                    .bind(collection)
                    .bind(uuid)
                    .bind(field)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(not_found)?;
                let value: Option<Value> = current.try_get("value")?;
                if value.as_ref().is_some_and(|v| !v.is_null() && !v.is_i64()) {
                    return Err(StoreError::NotNumeric { field: field.to_owned() });
                }

                sqlx::query(
                    r"UPDATE documents
                      SET fields = jsonb_set(fields, ARRAY[$3], to_jsonb(COALESCE((fields ->> $3)::bigint, 0) + $4))
                      WHERE collection = $1 AND id = $2",
                )
                .bind(collection)
                .bind(uuid)
                .bind(field)
                .bind(by)
                .execute(&self.pool)
                .await
                .map_err(|e| increment_error(e, field))?
            }
            FieldDelta::Set(value) => {
                sqlx::query("UPDATE documents SET fields = jsonb_set(fields, ARRAY[$3], $4) WHERE collection = $1 AND id = $2")
                    .bind(collection)
                    .bind(uuid)
                    .bind(field)
                    .bind(value)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "postgres_test.rs"]
mod tests;
