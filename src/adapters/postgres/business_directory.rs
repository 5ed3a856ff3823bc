//! PostgreSQL implementation of BusinessDirectory.
//!
//! Operators are listed in `platform_admins`.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{BusinessId, DomainError, UserId};
use crate::ports::BusinessDirectory;

use super::db_error;

pub struct PostgresBusinessDirectory {
    pool: PgPool,
}

impl PostgresBusinessDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusinessDirectory for PostgresBusinessDirectory {
    async fn business_for_user(&self, user_id: &UserId) -> Result<Option<BusinessId>, DomainError> {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM businesses WHERE owner_user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to look up business", e))?;

        Ok(id.map(BusinessId::from_uuid))
    }

    async fn is_admin(&self, user_id: &UserId) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM platform_admins WHERE user_id = $1)")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to check admin role", e))
    }
}
