//! TrialManager - self-service and admin-granted trials.
//!
//! A trial activates a paid plan exactly like an approved payment, with
//! `is_trial` set, and commits the trial row and plan together. A business
//! gets at most one trial.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{BillingError, PlanType, Trial};
use crate::domain::foundation::{BusinessId, Timestamp, UserId};
use crate::ports::{
    business_tag, AuditAction, AuditEntityType, AuditEntry, AuditLog, BillingUnitOfWork,
    CacheInvalidator, TrialOutcome, TrialRepository,
};

/// Self-service trial of the configured length.
#[derive(Debug, Clone)]
pub struct StartTrialCommand {
    pub business_id: BusinessId,
    pub plan_type: PlanType,
}

/// Admin grant with an explicit expiry.
#[derive(Debug, Clone)]
pub struct GrantTrialCommand {
    pub business_id: BusinessId,
    pub plan_type: PlanType,
    pub expires_at: Timestamp,
    pub granted_by: UserId,
}

pub struct TrialManager {
    trials: Arc<dyn TrialRepository>,
    unit_of_work: Arc<dyn BillingUnitOfWork>,
    audit_log: Arc<dyn AuditLog>,
    cache: Arc<dyn CacheInvalidator>,
    trial_days: i64,
}

impl TrialManager {
    pub fn new(
        trials: Arc<dyn TrialRepository>,
        unit_of_work: Arc<dyn BillingUnitOfWork>,
        audit_log: Arc<dyn AuditLog>,
        cache: Arc<dyn CacheInvalidator>,
        trial_days: i64,
    ) -> Self {
        Self {
            trials,
            unit_of_work,
            audit_log,
            cache,
            trial_days,
        }
    }

    pub async fn start_trial(&self, cmd: StartTrialCommand) -> Result<Trial, BillingError> {
        let now = Timestamp::now();
        self.create(cmd.business_id, cmd.plan_type, now, now.add_days(self.trial_days), None)
            .await
    }

    pub async fn grant_trial(&self, cmd: GrantTrialCommand) -> Result<Trial, BillingError> {
        let now = Timestamp::now();
        if !cmd.expires_at.is_after(&now) {
            return Err(BillingError::Validation(
                "trial expiry must be in the future".to_string(),
            ));
        }
        self.create(
            cmd.business_id,
            cmd.plan_type,
            now,
            cmd.expires_at,
            Some(cmd.granted_by),
        )
        .await
    }

    async fn create(
        &self,
        business_id: BusinessId,
        plan_type: PlanType,
        now: Timestamp,
        expires_at: Timestamp,
        granted_by: Option<UserId>,
    ) -> Result<Trial, BillingError> {
        if !plan_type.is_paid() {
            return Err(BillingError::Validation(
                "trials are only available for paid plans".to_string(),
            ));
        }

        if let Some(existing) = self.trials.find_by_business(&business_id).await? {
            return Err(BillingError::Conflict(format!(
                "business {} already has a trial (active: {})",
                business_id, existing.is_active
            )));
        }

        let trial = Trial::new(business_id, plan_type, now, expires_at, granted_by);

        // Uniqueness in the store catches a concurrent start.
        match self.unit_of_work.start_trial(&trial).await? {
            TrialOutcome::Created => {}
            TrialOutcome::AlreadyExists => {
                return Err(BillingError::Conflict(format!(
                    "business {} already has a trial",
                    business_id
                )));
            }
        }

        tracing::info!(
            trial_id = %trial.id,
            business_id = %business_id,
            plan = %plan_type,
            expires_at = %expires_at.as_datetime(),
            "Trial started"
        );

        self.record_audit(&trial).await;
        if let Err(e) = self.cache.invalidate_tags(&[business_tag(&business_id)]).await {
            tracing::warn!(business_id = %business_id, error = %e, "Cache invalidation failed");
        }

        Ok(trial)
    }

    async fn record_audit(&self, trial: &Trial) {
        let entry = AuditEntry::new(
            AuditEntityType::Trial,
            trial.id.to_string(),
            AuditAction::Create,
            trial.granted_by.clone(),
        )
        .with_details(json!({
            "business_id": trial.business_id,
            "plan": trial.plan,
            "expires_at": trial.expires_at,
        }));

        if let Err(e) = self.audit_log.append(entry).await {
            tracing::warn!(trial_id = %trial.id, error = %e, "Audit log append failed");
        }
    }
}
