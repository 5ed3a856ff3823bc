//! PostgreSQL implementation of WebhookEventRepository.
//!
//! Uniqueness is enforced by the table: `request_id` is the primary key and
//! `dedupe_key` carries a unique index. Concurrent inserts of the same
//! delivery resolve to exactly one `Inserted`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

use super::db_error;

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    request_id: String,
    dedupe_key: String,
    source: String,
    event_type: String,
    external_id: Option<String>,
    raw_payload: serde_json::Value,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    received_at: DateTime<Utc>,
}

impl From<WebhookEventRow> for WebhookEventRecord {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEventRecord {
            request_id: row.request_id,
            dedupe_key: row.dedupe_key,
            source: row.source,
            event_type: row.event_type,
            external_id: row.external_id,
            raw_payload: row.raw_payload,
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            received_at: Timestamp::from_datetime(row.received_at),
        }
    }
}

const SELECT_EVENT: &str = r#"
    SELECT request_id, dedupe_key, source, event_type, external_id, raw_payload,
           processed, processed_at, received_at
    FROM webhook_events
"#;

/// Sets `processed` on a ledger row. Already-processed rows keep their timestamp.
pub(super) async fn mark_event_processed(
    conn: &mut PgConnection,
    request_id: &str,
    at: Timestamp,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE webhook_events SET processed = TRUE, processed_at = $2
        WHERE request_id = $1 AND processed = FALSE
        "#,
    )
    .bind(request_id)
    .bind(at.as_datetime())
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn insert(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (
                request_id, dedupe_key, source, event_type, external_id, raw_payload,
                processed, processed_at, received_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&record.request_id)
        .bind(&record.dedupe_key)
        .bind(&record.source)
        .bind(&record.event_type)
        .bind(&record.external_id)
        .bind(&record.raw_payload)
        .bind(record.processed)
        .bind(record.processed_at.map(|t| *t.as_datetime()))
        .bind(record.received_at.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(SaveResult::AlreadyExists),
            Ok(_) => Ok(SaveResult::Inserted),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(SaveResult::AlreadyExists)
            }
            Err(e) => Err(db_error("Failed to insert webhook event", e)),
        }
    }

    async fn mark_processed(&self, request_id: &str, at: Timestamp) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))?;
        mark_event_processed(&mut *conn, request_id, at)
            .await
            .map_err(|e| db_error("Failed to mark webhook event", e))
    }

    async fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        let row: Option<WebhookEventRow> =
            sqlx::query_as(&format!("{} WHERE request_id = $1", SELECT_EVENT))
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find webhook event", e))?;

        Ok(row.map(WebhookEventRecord::from))
    }

    async fn list_unprocessed(&self, limit: u32) -> Result<Vec<WebhookEventRecord>, DomainError> {
        let rows: Vec<WebhookEventRow> = sqlx::query_as(&format!(
            "{} WHERE processed = FALSE ORDER BY received_at ASC LIMIT $1",
            SELECT_EVENT
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list unprocessed webhook events", e))?;

        Ok(rows.into_iter().map(WebhookEventRecord::from).collect())
    }

    async fn delete_processed_before(&self, before: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM webhook_events WHERE processed = TRUE AND received_at < $1",
        )
        .bind(before.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to purge webhook events", e))?;

        Ok(result.rows_affected())
    }
}
