//! Trial grants.
//!
//! A trial is a time-boxed, no-payment grant of a paid tier. A business can
//! hold at most one trial.

use serde::Serialize;

use crate::domain::foundation::{BusinessId, Timestamp, TrialId, UserId};

use super::{PlanActivation, PlanType};

/// A trial period granted to a business.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trial {
    pub id: TrialId,
    pub business_id: BusinessId,
    pub plan: PlanType,
    pub is_active: bool,
    pub expires_at: Timestamp,
    pub activated_at: Timestamp,
    /// Admin who granted the trial; `None` for self-service trials.
    pub granted_by: Option<UserId>,
}

impl Trial {
    pub fn new(
        business_id: BusinessId,
        plan: PlanType,
        activated_at: Timestamp,
        expires_at: Timestamp,
        granted_by: Option<UserId>,
    ) -> Self {
        Self {
            id: TrialId::new(),
            business_id,
            plan,
            is_active: true,
            expires_at,
            activated_at,
            granted_by,
        }
    }

    /// The plan activation this trial grants.
    pub fn plan_activation(&self) -> PlanActivation {
        PlanActivation {
            plan_type: self.plan,
            activated_at: self.activated_at,
            expires_at: self.expires_at,
            is_trial: true,
        }
    }

    /// Returns true if the trial is flagged active and has not run out.
    pub fn is_running(&self, now: Timestamp) -> bool {
        self.is_active && self.expires_at.is_after(&now)
    }
}
