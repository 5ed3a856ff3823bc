//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Payment, PaymentStatus, PlanType};
use crate::domain::foundation::{BusinessId, DomainError, ErrorCode, PaymentId, Timestamp};
use crate::ports::PaymentRepository;

use super::{corrupt_column, db_error};

pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_PAYMENT: &str = r#"
    SELECT id, business_id, plan, amount_cents, currency, status, external_status,
           external_payment_id, payment_method, created_at, updated_at
    FROM payments
"#;

/// Database row representation of a payment.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    business_id: Uuid,
    plan: String,
    amount_cents: i64,
    currency: String,
    status: String,
    external_status: String,
    external_payment_id: Option<String>,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let plan: PlanType = row.plan.parse().map_err(|e| corrupt_column("plan", e))?;
        let status: PaymentStatus = row.status.parse().map_err(|e| corrupt_column("status", e))?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            business_id: BusinessId::from_uuid(row.business_id),
            plan,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status,
            external_status: row.external_status,
            external_payment_id: row.external_payment_id,
            payment_method: row.payment_method,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, business_id, plan, amount_cents, currency, status, external_status,
                external_payment_id, payment_method, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.business_id.as_uuid())
        .bind(payment.plan.as_str())
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.external_status)
        .bind(&payment.external_payment_id)
        .bind(&payment.payment_method)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert payment", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_PAYMENT))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_by_external_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE external_payment_id = $1 ORDER BY created_at DESC LIMIT 1",
            SELECT_PAYMENT
        ))
        .bind(external_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find payment by external id", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn set_external_payment_id(
        &self,
        id: &PaymentId,
        external_payment_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE payments SET external_payment_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(external_payment_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to store external payment id", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                .with_detail("id", id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, plan: &str) -> PaymentRow {
        let now = Utc::now();
        PaymentRow {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            plan: plan.to_string(),
            amount_cents: 500_000,
            currency: "ARS".to_string(),
            status: status.to_string(),
            external_status: "approved".to_string(),
            external_payment_id: Some("123".to_string()),
            payment_method: Some("visa".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_payment() {
        let payment = Payment::try_from(row("approved", "BASIC")).unwrap();
        assert_eq!(payment.status, PaymentStatus::Approved);
        assert_eq!(payment.plan, PlanType::Basic);
        assert_eq!(payment.external_payment_id.as_deref(), Some("123"));
    }

    #[test]
    fn unknown_status_is_database_error() {
        let err = Payment::try_from(row("refunded", "BASIC")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn unknown_plan_is_database_error() {
        assert!(Payment::try_from(row("pending", "GOLD")).is_err());
    }
}
