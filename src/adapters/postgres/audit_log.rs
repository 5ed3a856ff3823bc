//! PostgreSQL implementation of AuditLog.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::DomainError;
use crate::ports::{AuditEntry, AuditLog};

use super::db_error;

/// Append-only audit trail stored in `audit_logs`.
pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLog for PostgresAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (entity_type, entity_id, action, actor, details, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.entity_type.as_str())
        .bind(&entry.entity_id)
        .bind(entry.action.as_str())
        .bind(entry.actor.as_ref().map(|u| u.as_str().to_string()))
        .bind(&entry.details)
        .bind(entry.occurred_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to append audit entry", e))?;

        Ok(())
    }
}
