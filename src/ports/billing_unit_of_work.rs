//! BillingUnitOfWork port - multi-entity writes that must commit together.
//!
//! Each method is one transaction. On any failure nothing is written, so a
//! webhook event stays `processed = false` and can be replayed safely.

use async_trait::async_trait;

use crate::domain::billing::{CurrentPlan, Payment, PlanActivation, Trial};
use crate::domain::foundation::{DomainError, Timestamp};

/// A payment resolution and everything that commits with it.
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    /// Payment with its new status and authoritative values already applied.
    pub payment: Payment,
    /// Activation applied to the plan row locked inside the transaction;
    /// `None` leaves the business's plan untouched.
    pub activation: Option<PlanActivation>,
    /// Ledger row to mark processed, if the transition came from a webhook.
    pub webhook_request_id: Option<String>,
    pub occurred_at: Timestamp,
}

/// Result of applying a payment transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Payment, plan and ledger were written. Carries the stored plan when
    /// an activation was applied.
    Applied { plan: Option<CurrentPlan> },
    /// The stored payment was no longer pending. Only the ledger row was marked.
    PaymentNotPending,
}

/// Result of starting a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialOutcome {
    Created,
    /// The business already has a trial; nothing was written.
    AlreadyExists,
}

#[async_trait]
pub trait BillingUnitOfWork: Send + Sync {
    /// Writes the payment, the plan and the ledger mark in one transaction.
    ///
    /// The activation is applied to the plan row as read, under lock, in the
    /// same transaction.
    ///
    /// The payment update is guarded on the stored status still being
    /// `pending`; if it is not, the payment and plan are left alone and
    /// `TransitionOutcome::PaymentNotPending` is returned.
    async fn apply_payment_transition(
        &self,
        transition: PaymentTransition,
    ) -> Result<TransitionOutcome, DomainError>;

    /// Inserts the trial and applies its activation to the locked plan row
    /// in one transaction.
    async fn start_trial(&self, trial: &Trial) -> Result<TrialOutcome, DomainError>;

    /// Stores an expired plan and deactivates the business's trial.
    ///
    /// Guarded on the stored plan still being ACTIVE; returns false if it was not.
    async fn expire_plan(&self, plan: &CurrentPlan) -> Result<bool, DomainError>;
}
