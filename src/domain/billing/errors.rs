//! Error taxonomy for payment reconciliation and plan management.
//!
//! A duplicate delivery is not represented here: the ledger port reports it as
//! `SaveResult::AlreadyExists`, which the orchestrator treats as success.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors raised by the billing handlers.
#[derive(Debug, Clone, Error)]
pub enum BillingError {
    /// Notification signature did not verify.
    #[error("Invalid signature")]
    AuthenticationFailure,

    /// The internal payment behind a notification could not be located.
    #[error("Unresolved payment reference for external payment {external_id}")]
    UnresolvedReference { external_id: String },

    /// The authoritative lookup against the processor failed.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// A terminal payment or plan was asked to move again.
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// A transaction could not commit. Requires operator attention.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BillingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn unresolved(external_id: impl Into<String>) -> Self {
        BillingError::UnresolvedReference {
            external_id: external_id.into(),
        }
    }

    /// Returns true if the failure must page an operator.
    pub fn is_alerting(&self) -> bool {
        matches!(self, BillingError::PersistenceFailure(_))
    }

    /// Returns true if the webhook event stays unprocessed and can be replayed.
    pub fn leaves_event_unprocessed(&self) -> bool {
        matches!(
            self,
            BillingError::UnresolvedReference { .. }
                | BillingError::GatewayUnavailable(_)
                | BillingError::PersistenceFailure(_)
                | BillingError::NotFound { .. }
        )
    }

    /// HTTP status for the synchronous billing endpoints.
    ///
    /// The webhook route does not use this mapping; it always answers 200.
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::Conflict(_) => StatusCode::CONFLICT,
            BillingError::NotFound { .. } | BillingError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            BillingError::Validation(_) => StatusCode::BAD_REQUEST,
            BillingError::AuthenticationFailure => StatusCode::UNAUTHORIZED,
            BillingError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            BillingError::UnresolvedReference { .. }
            | BillingError::InvalidStateTransition(_)
            | BillingError::PersistenceFailure(_)
            | BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for BillingError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => BillingError::Validation(err.message),
            ErrorCode::PaymentNotFound => BillingError::NotFound {
                entity: "Payment",
                id: err.details.get("id").cloned().unwrap_or(err.message),
            },
            ErrorCode::BusinessNotFound => BillingError::NotFound {
                entity: "Business",
                id: err.details.get("id").cloned().unwrap_or(err.message),
            },
            ErrorCode::WebhookEventNotFound => BillingError::NotFound {
                entity: "Webhook event",
                id: err.details.get("id").cloned().unwrap_or(err.message),
            },
            ErrorCode::PlanNotFound => BillingError::PlanNotFound(err.message),
            ErrorCode::InvalidStateTransition => BillingError::InvalidStateTransition(err.message),
            ErrorCode::TrialExists | ErrorCode::ConcurrencyConflict => {
                BillingError::Conflict(err.message)
            }
            ErrorCode::DatabaseError => BillingError::PersistenceFailure(err.message),
            ErrorCode::ExternalServiceError => BillingError::GatewayUnavailable(err.message),
            ErrorCode::CacheError | ErrorCode::InternalError => BillingError::Internal(err.message),
        }
    }
}

impl From<ValidationError> for BillingError {
    fn from(err: ValidationError) -> Self {
        BillingError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn authentication_failure_displays_correctly() {
        assert_eq!(BillingError::AuthenticationFailure.to_string(), "Invalid signature");
    }

    #[test]
    fn not_found_displays_entity_and_id() {
        let err = BillingError::not_found("Payment", "p-1");
        assert_eq!(err.to_string(), "Payment not found: p-1");
    }

    #[test]
    fn unresolved_reference_displays_external_id() {
        let err = BillingError::unresolved("987");
        assert_eq!(
            err.to_string(),
            "Unresolved payment reference for external payment 987"
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Classification
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn only_persistence_failure_alerts() {
        assert!(BillingError::PersistenceFailure("commit failed".into()).is_alerting());
        assert!(!BillingError::GatewayUnavailable("timeout".into()).is_alerting());
        assert!(!BillingError::unresolved("1").is_alerting());
    }

    #[test]
    fn reconciliation_failures_leave_event_unprocessed() {
        assert!(BillingError::GatewayUnavailable("timeout".into()).leaves_event_unprocessed());
        assert!(BillingError::unresolved("1").leaves_event_unprocessed());
        assert!(!BillingError::AuthenticationFailure.leaves_event_unprocessed());
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(BillingError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(BillingError::PlanNotFound("GOLD".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(BillingError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(BillingError::AuthenticationFailure.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            BillingError::PersistenceFailure("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Conversions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn database_domain_error_becomes_persistence_failure() {
        let err: BillingError = DomainError::database("deadlock detected").into();
        assert!(matches!(err, BillingError::PersistenceFailure(msg) if msg == "deadlock detected"));
    }

    #[test]
    fn trial_exists_becomes_conflict() {
        let err: BillingError = DomainError::new(ErrorCode::TrialExists, "trial exists").into();
        assert!(matches!(err, BillingError::Conflict(_)));
    }

    #[test]
    fn payment_not_found_uses_id_detail() {
        let err: BillingError = DomainError::new(ErrorCode::PaymentNotFound, "missing")
            .with_detail("id", "abc")
            .into();
        assert_eq!(err.to_string(), "Payment not found: abc");
    }
}
