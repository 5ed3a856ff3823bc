//! Live subscription state of a business.
//!
//! Every business owns exactly one `CurrentPlan`. While the plan is ACTIVE its
//! expiry lies in the future; the expiry sweep moves lapsed plans to EXPIRED.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{BusinessId, StateMachine, Timestamp, ValidationError};

use super::PlanType;

/// Subscription status of a business's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanStatus {
    Active,
    Cancelled,
    Expired,
    Inactive,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "ACTIVE",
            PlanStatus::Cancelled => "CANCELLED",
            PlanStatus::Expired => "EXPIRED",
            PlanStatus::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(PlanStatus::Active),
            "CANCELLED" => Ok(PlanStatus::Cancelled),
            "EXPIRED" => Ok(PlanStatus::Expired),
            "INACTIVE" => Ok(PlanStatus::Inactive),
            other => Err(ValidationError::invalid_format(
                "plan_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PlanStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PlanStatus::*;
        matches!(
            (self, target),
            (Inactive, Active)
                | (Active, Active) // Upgrade or renewal
                | (Active, Cancelled)
                | (Active, Expired)
                | (Cancelled, Active)
                | (Cancelled, Expired)
                | (Expired, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PlanStatus::*;
        match self {
            Inactive => vec![Active],
            Active => vec![Active, Cancelled, Expired],
            Cancelled => vec![Active, Expired],
            Expired => vec![Active],
        }
    }
}

/// The plan a business is currently on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentPlan {
    pub business_id: BusinessId,
    pub plan_type: PlanType,
    pub plan_status: PlanStatus,
    pub expires_at: Option<Timestamp>,
    pub activated_at: Option<Timestamp>,
    pub is_trial: bool,
    pub products_used: u32,
    pub images_used: u32,
    pub updated_at: Timestamp,
}

impl CurrentPlan {
    /// Plan every business starts with.
    pub fn inactive(business_id: BusinessId, now: Timestamp) -> Self {
        Self {
            business_id,
            plan_type: PlanType::Free,
            plan_status: PlanStatus::Inactive,
            expires_at: None,
            activated_at: None,
            is_trial: false,
            products_used: 0,
            images_used: 0,
            updated_at: now,
        }
    }

    /// Activates `plan_type` until `expires_at`, resetting usage counters.
    ///
    /// # Errors
    ///
    /// Fails if `expires_at` is not after `now` or the current status cannot
    /// become ACTIVE.
    pub fn activate(
        &mut self,
        plan_type: PlanType,
        now: Timestamp,
        expires_at: Timestamp,
        is_trial: bool,
    ) -> Result<(), ValidationError> {
        if !expires_at.is_after(&now) {
            return Err(ValidationError::invalid_format(
                "expires_at",
                "an active plan must expire in the future",
            ));
        }
        self.plan_status = self.plan_status.transition_to(PlanStatus::Active)?;
        self.plan_type = plan_type;
        self.expires_at = Some(expires_at);
        self.activated_at = Some(now);
        self.is_trial = is_trial;
        self.products_used = 0;
        self.images_used = 0;
        self.updated_at = now;
        Ok(())
    }

    /// Returns true if the plan is ACTIVE but its expiry has passed.
    pub fn is_lapsed(&self, now: Timestamp) -> bool {
        self.plan_status == PlanStatus::Active
            && self.expires_at.map_or(true, |expiry| !expiry.is_after(&now))
    }

    /// Moves a lapsed plan to EXPIRED. Returns false if nothing changed.
    pub fn expire_if_lapsed(&mut self, now: Timestamp) -> bool {
        if !self.is_lapsed(now) {
            return false;
        }
        self.plan_status = PlanStatus::Expired;
        self.is_trial = false;
        self.updated_at = now;
        true
    }
}

/// A plan activation, applied to whatever plan is stored when the write
/// commits rather than to an earlier read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanActivation {
    pub plan_type: PlanType,
    pub activated_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_trial: bool,
}

impl PlanActivation {
    /// Activates `current`, or a fresh inactive plan when the business has none.
    pub fn apply_to(
        &self,
        business_id: BusinessId,
        current: Option<CurrentPlan>,
    ) -> Result<CurrentPlan, ValidationError> {
        let mut plan = current.unwrap_or_else(|| CurrentPlan::inactive(business_id, self.activated_at));
        plan.activate(self.plan_type, self.activated_at, self.expires_at, self.is_trial)?;
        Ok(plan)
    }
}
