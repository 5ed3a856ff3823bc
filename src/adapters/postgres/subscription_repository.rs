//! PostgreSQL implementation of CurrentPlanRepository and TrialRepository.
//!
//! Both tables are keyed by business; writes that span them go through
//! `PostgresBillingUnitOfWork`, which reuses the statements defined here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::billing::{CurrentPlan, PlanStatus, PlanType, Trial};
use crate::domain::foundation::{BusinessId, DomainError, Timestamp, TrialId, UserId};
use crate::ports::{CurrentPlanRepository, TrialRepository};

use super::{corrupt_column, db_error};

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CurrentPlanRow {
    business_id: Uuid,
    plan_type: String,
    plan_status: String,
    expires_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
    is_trial: bool,
    products_used: i32,
    images_used: i32,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CurrentPlanRow> for CurrentPlan {
    type Error = DomainError;

    fn try_from(row: CurrentPlanRow) -> Result<Self, Self::Error> {
        let plan_type: PlanType = row.plan_type.parse().map_err(|e| corrupt_column("plan_type", e))?;
        let plan_status: PlanStatus = row
            .plan_status
            .parse()
            .map_err(|e| corrupt_column("plan_status", e))?;

        Ok(CurrentPlan {
            business_id: BusinessId::from_uuid(row.business_id),
            plan_type,
            plan_status,
            expires_at: row.expires_at.map(Timestamp::from_datetime),
            activated_at: row.activated_at.map(Timestamp::from_datetime),
            is_trial: row.is_trial,
            products_used: row.products_used.max(0) as u32,
            images_used: row.images_used.max(0) as u32,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TrialRow {
    id: Uuid,
    business_id: Uuid,
    plan: String,
    is_active: bool,
    expires_at: DateTime<Utc>,
    activated_at: DateTime<Utc>,
    granted_by: Option<String>,
}

impl TryFrom<TrialRow> for Trial {
    type Error = DomainError;

    fn try_from(row: TrialRow) -> Result<Self, Self::Error> {
        let plan: PlanType = row.plan.parse().map_err(|e| corrupt_column("plan", e))?;
        let granted_by = row
            .granted_by
            .map(UserId::new)
            .transpose()
            .map_err(|e| corrupt_column("granted_by", e))?;

        Ok(Trial {
            id: TrialId::from_uuid(row.id),
            business_id: BusinessId::from_uuid(row.business_id),
            plan,
            is_active: row.is_active,
            expires_at: Timestamp::from_datetime(row.expires_at),
            activated_at: Timestamp::from_datetime(row.activated_at),
            granted_by,
        })
    }
}

const SELECT_PLAN: &str = r#"
    SELECT business_id, plan_type, plan_status, expires_at, activated_at, is_trial,
           products_used, images_used, updated_at
    FROM current_plans
"#;

/// Reads the business's plan and locks the row until the transaction ends.
pub(super) async fn lock_plan(
    conn: &mut PgConnection,
    business_id: &BusinessId,
) -> Result<Option<CurrentPlan>, DomainError> {
    let row: Option<CurrentPlanRow> =
        sqlx::query_as(&format!("{} WHERE business_id = $1 FOR UPDATE", SELECT_PLAN))
            .bind(business_id.as_uuid())
            .fetch_optional(conn)
            .await
            .map_err(|e| db_error("Failed to lock current plan", e))?;

    row.map(CurrentPlan::try_from).transpose()
}

/// Inserts or replaces the business's plan. Usage counters are left alone on update.
pub(super) async fn upsert_plan(conn: &mut PgConnection, plan: &CurrentPlan) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO current_plans (
            business_id, plan_type, plan_status, expires_at, activated_at, is_trial,
            products_used, images_used, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (business_id) DO UPDATE SET
            plan_type = EXCLUDED.plan_type,
            plan_status = EXCLUDED.plan_status,
            expires_at = EXCLUDED.expires_at,
            activated_at = EXCLUDED.activated_at,
            is_trial = EXCLUDED.is_trial,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(plan.business_id.as_uuid())
    .bind(plan.plan_type.as_str())
    .bind(plan.plan_status.as_str())
    .bind(plan.expires_at.map(|t| *t.as_datetime()))
    .bind(plan.activated_at.map(|t| *t.as_datetime()))
    .bind(plan.is_trial)
    .bind(plan.products_used as i32)
    .bind(plan.images_used as i32)
    .bind(plan.updated_at.as_datetime())
    .execute(conn)
    .await?;
    Ok(())
}

/// Inserts a trial unless the business already has one. Returns false on conflict.
pub(super) async fn insert_trial(conn: &mut PgConnection, trial: &Trial) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO trials (id, business_id, plan, is_active, expires_at, activated_at, granted_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (business_id) DO NOTHING
        "#,
    )
    .bind(trial.id.as_uuid())
    .bind(trial.business_id.as_uuid())
    .bind(trial.plan.as_str())
    .bind(trial.is_active)
    .bind(trial.expires_at.as_datetime())
    .bind(trial.activated_at.as_datetime())
    .bind(trial.granted_by.as_ref().map(|u| u.as_str().to_string()))
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

#[async_trait]
impl CurrentPlanRepository for PostgresSubscriptionRepository {
    async fn find_by_business(
        &self,
        business_id: &BusinessId,
    ) -> Result<Option<CurrentPlan>, DomainError> {
        let row: Option<CurrentPlanRow> =
            sqlx::query_as(&format!("{} WHERE business_id = $1", SELECT_PLAN))
                .bind(business_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find current plan", e))?;

        row.map(CurrentPlan::try_from).transpose()
    }

    async fn find_lapsed(&self, now: Timestamp, limit: u32) -> Result<Vec<CurrentPlan>, DomainError> {
        let rows: Vec<CurrentPlanRow> = sqlx::query_as(&format!(
            r#"{} WHERE plan_status = 'ACTIVE' AND (expires_at IS NULL OR expires_at <= $1)
                ORDER BY expires_at NULLS FIRST LIMIT $2"#,
            SELECT_PLAN
        ))
        .bind(now.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list lapsed plans", e))?;

        rows.into_iter().map(CurrentPlan::try_from).collect()
    }
}

#[async_trait]
impl TrialRepository for PostgresSubscriptionRepository {
    async fn find_by_business(&self, business_id: &BusinessId) -> Result<Option<Trial>, DomainError> {
        let row: Option<TrialRow> = sqlx::query_as(
            r#"
            SELECT id, business_id, plan, is_active, expires_at, activated_at, granted_by
            FROM trials
            WHERE business_id = $1
            "#,
        )
        .bind(business_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find trial", e))?;

        row.map(Trial::try_from).transpose()
    }
}
