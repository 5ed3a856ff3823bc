//! PostgreSQL implementation of BillingUnitOfWork.
//!
//! Each operation runs in one transaction. Dropping the transaction on an
//! early `?` rolls it back.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use crate::domain::billing::{CurrentPlan, Trial};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{BillingUnitOfWork, PaymentTransition, TransitionOutcome, TrialOutcome};

use super::db_error;
use super::subscription_repository::{insert_trial, lock_plan, upsert_plan};
use super::webhook_event_repository::mark_event_processed;

pub struct PostgresBillingUnitOfWork {
    pool: PgPool,
}

impl PostgresBillingUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn mark_ledger(
    conn: &mut PgConnection,
    request_id: Option<&str>,
    at: Timestamp,
) -> Result<(), DomainError> {
    if let Some(request_id) = request_id {
        mark_event_processed(conn, request_id, at)
            .await
            .map_err(|e| db_error("Failed to mark webhook event", e))?;
    }
    Ok(())
}

#[async_trait]
impl BillingUnitOfWork for PostgresBillingUnitOfWork {
    async fn apply_payment_transition(
        &self,
        transition: PaymentTransition,
    ) -> Result<TransitionOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let payment = &transition.payment;
        let request_id = transition.webhook_request_id.as_deref();

        // Guarded on the stored status so concurrent deliveries resolve a payment once.
        let result = sqlx::query(
            r#"
            UPDATE payments SET
                status = $2,
                external_status = $3,
                external_payment_id = $4,
                payment_method = $5,
                amount_cents = $6,
                currency = $7,
                updated_at = $8
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.status.as_str())
        .bind(&payment.external_status)
        .bind(&payment.external_payment_id)
        .bind(&payment.payment_method)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update payment", e))?;

        if result.rows_affected() == 0 {
            mark_ledger(&mut *tx, request_id, transition.occurred_at).await?;
            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit transaction", e))?;
            return Ok(TransitionOutcome::PaymentNotPending);
        }

        let plan = match &transition.activation {
            Some(activation) => {
                let stored = lock_plan(&mut *tx, &payment.business_id).await?;
                let plan = activation.apply_to(payment.business_id, stored).map_err(|e| {
                    DomainError::new(ErrorCode::InvalidStateTransition, e.to_string())
                })?;
                upsert_plan(&mut *tx, &plan)
                    .await
                    .map_err(|e| db_error("Failed to store current plan", e))?;
                Some(plan)
            }
            None => None,
        };
        mark_ledger(&mut *tx, request_id, transition.occurred_at).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok(TransitionOutcome::Applied { plan })
    }

    async fn start_trial(&self, trial: &Trial) -> Result<TrialOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let inserted = insert_trial(&mut *tx, trial)
            .await
            .map_err(|e| db_error("Failed to insert trial", e))?;
        if !inserted {
            return Ok(TrialOutcome::AlreadyExists);
        }

        let stored = lock_plan(&mut *tx, &trial.business_id).await?;
        let plan = trial
            .plan_activation()
            .apply_to(trial.business_id, stored)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;
        upsert_plan(&mut *tx, &plan)
            .await
            .map_err(|e| db_error("Failed to store current plan", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok(TrialOutcome::Created)
    }

    async fn expire_plan(&self, plan: &CurrentPlan) -> Result<bool, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE current_plans SET plan_status = $2, is_trial = $3, updated_at = $4
            WHERE business_id = $1 AND plan_status = 'ACTIVE'
            "#,
        )
        .bind(plan.business_id.as_uuid())
        .bind(plan.plan_status.as_str())
        .bind(plan.is_trial)
        .bind(plan.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to expire plan", e))?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE trials SET is_active = FALSE WHERE business_id = $1")
            .bind(plan.business_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to deactivate trial", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))?;
        Ok(true)
    }
}
