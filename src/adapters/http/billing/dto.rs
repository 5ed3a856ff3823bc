//! HTTP DTOs (Data Transfer Objects) for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::NotificationOutcome;
use crate::domain::billing::{CurrentPlan, PlanStatus, PlanType, Trial};
use crate::domain::foundation::BusinessId;

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /billing/checkout` and `POST /billing/trial`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanSelectionRequest {
    pub plan: PlanType,
}

/// Body of `POST /admin/trials`.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantTrialRequest {
    pub business_id: BusinessId,
    pub plan: PlanType,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnprocessedEventsQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Acknowledgement returned to the processor. The status code is always 200.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WebhookAck {
    Received { received: bool },
    Error { error: String },
}

impl From<&NotificationOutcome> for WebhookAck {
    fn from(outcome: &NotificationOutcome) -> Self {
        match outcome.error() {
            Some(err) => WebhookAck::Error {
                error: err.to_string(),
            },
            None => WebhookAck::Received { received: true },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentPlanResponse {
    pub business_id: String,
    pub plan_type: PlanType,
    pub plan_status: PlanStatus,
    pub is_trial: bool,
    /// ISO 8601, absent for plans that never expire.
    pub expires_at: Option<String>,
    pub activated_at: Option<String>,
    pub products_used: u32,
    pub images_used: u32,
}

impl From<CurrentPlan> for CurrentPlanResponse {
    fn from(plan: CurrentPlan) -> Self {
        Self {
            business_id: plan.business_id.to_string(),
            plan_type: plan.plan_type,
            plan_status: plan.plan_status,
            is_trial: plan.is_trial,
            expires_at: plan.expires_at.map(|t| t.as_datetime().to_rfc3339()),
            activated_at: plan.activated_at.map(|t| t.as_datetime().to_rfc3339()),
            products_used: plan.products_used,
            images_used: plan.images_used,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialResponse {
    pub id: String,
    pub business_id: String,
    pub plan: PlanType,
    pub is_active: bool,
    pub activated_at: String,
    pub expires_at: String,
    pub granted_by: Option<String>,
}

impl From<Trial> for TrialResponse {
    fn from(trial: Trial) -> Self {
        Self {
            id: trial.id.to_string(),
            business_id: trial.business_id.to_string(),
            plan: trial.plan,
            is_active: trial.is_active,
            activated_at: trial.activated_at.as_datetime().to_rfc3339(),
            expires_at: trial.expires_at.as_datetime().to_rfc3339(),
            granted_by: trial.granted_by.map(|u| u.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayResponse {
    pub request_id: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}
