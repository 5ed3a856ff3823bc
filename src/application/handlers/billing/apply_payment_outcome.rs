//! ApplyPaymentOutcomeHandler - the subscription state machine.
//!
//! Resolves a pending payment from a normalized processor outcome and, on
//! approval, activates the paid plan. Payment, plan and ledger mark commit in
//! one unit of work. A payment that is no longer pending is left untouched,
//! which makes re-delivery and manual replay safe.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, CurrentPlan, NormalizedStatus, Payment, PaymentStatus, PlanActivation, Settlement,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    business_tag, BillingUnitOfWork, CacheInvalidator, GatewayRecord, PaymentTransition,
    TransitionOutcome,
};

/// Command to apply a processor outcome to a payment.
#[derive(Debug, Clone)]
pub struct ApplyPaymentOutcomeCommand {
    pub outcome: NormalizedStatus,
    pub payment: Payment,
    pub gateway_record: GatewayRecord,
    /// Ledger row to mark processed in the same transaction.
    pub webhook_request_id: Option<String>,
}

/// Result of applying an outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyPaymentOutcomeResult {
    /// The payment moved (or re-affirmed pending) and the writes committed.
    Applied {
        payment: Payment,
        plan: Option<CurrentPlan>,
    },
    /// The payment was already terminal. Nothing changed.
    AlreadyTerminal,
}

pub struct ApplyPaymentOutcomeHandler {
    unit_of_work: Arc<dyn BillingUnitOfWork>,
    cache: Arc<dyn CacheInvalidator>,
    subscription_days: i64,
}

impl ApplyPaymentOutcomeHandler {
    pub fn new(
        unit_of_work: Arc<dyn BillingUnitOfWork>,
        cache: Arc<dyn CacheInvalidator>,
        subscription_days: i64,
    ) -> Self {
        Self {
            unit_of_work,
            cache,
            subscription_days,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApplyPaymentOutcomeCommand,
    ) -> Result<ApplyPaymentOutcomeResult, BillingError> {
        let now = Timestamp::now();

        // A terminal payment still goes through the unit of work so the
        // ledger row is marked in the same transaction.
        if !cmd.payment.is_pending() {
            return self
                .acknowledge_terminal(cmd.payment, cmd.webhook_request_id, now)
                .await;
        }

        let target = match cmd.outcome {
            NormalizedStatus::Approved => PaymentStatus::Approved,
            NormalizedStatus::Pending => PaymentStatus::Pending,
            NormalizedStatus::Rejected | NormalizedStatus::Unknown => PaymentStatus::Rejected,
        };

        let settlement = settlement_from(&cmd.gateway_record, cmd.outcome);
        let mut payment = cmd.payment;
        payment
            .resolve(target, &settlement, now)
            .map_err(|e| BillingError::InvalidStateTransition(e.to_string()))?;

        // Applied to the plan as stored when the transaction commits.
        let activation = (target == PaymentStatus::Approved).then(|| PlanActivation {
            plan_type: payment.plan,
            activated_at: now,
            expires_at: now.add_days(self.subscription_days),
            is_trial: false,
        });

        let outcome = self
            .unit_of_work
            .apply_payment_transition(PaymentTransition {
                payment: payment.clone(),
                activation,
                webhook_request_id: cmd.webhook_request_id,
                occurred_at: now,
            })
            .await?;

        match outcome {
            TransitionOutcome::Applied { plan } => {
                tracing::info!(
                    payment_id = %payment.id,
                    business_id = %payment.business_id,
                    outcome = %cmd.outcome,
                    status = %payment.status,
                    "Payment outcome applied"
                );
                self.invalidate_business_cache(&payment).await;
                Ok(ApplyPaymentOutcomeResult::Applied { payment, plan })
            }
            TransitionOutcome::PaymentNotPending => {
                // Another delivery resolved it between our read and the guarded write.
                tracing::debug!(
                    payment_id = %payment.id,
                    "Payment resolved concurrently, outcome not applied"
                );
                Ok(ApplyPaymentOutcomeResult::AlreadyTerminal)
            }
        }
    }

    async fn acknowledge_terminal(
        &self,
        payment: Payment,
        webhook_request_id: Option<String>,
        now: Timestamp,
    ) -> Result<ApplyPaymentOutcomeResult, BillingError> {
        tracing::debug!(
            payment_id = %payment.id,
            status = %payment.status,
            "Payment already terminal, treating outcome as no-op"
        );
        self.unit_of_work
            .apply_payment_transition(PaymentTransition {
                payment,
                activation: None,
                webhook_request_id,
                occurred_at: now,
            })
            .await?;
        Ok(ApplyPaymentOutcomeResult::AlreadyTerminal)
    }

    /// Best effort; stale reads heal on the cache TTL.
    async fn invalidate_business_cache(&self, payment: &Payment) {
        let tags = [business_tag(&payment.business_id)];
        if let Err(e) = self.cache.invalidate_tags(&tags).await {
            tracing::warn!(
                business_id = %payment.business_id,
                error = %e,
                "Cache invalidation failed"
            );
        }
    }
}

/// Authoritative values from the gateway record.
fn settlement_from(record: &GatewayRecord, outcome: NormalizedStatus) -> Settlement {
    Settlement {
        external_status: record
            .status
            .clone()
            .unwrap_or_else(|| outcome.as_str().to_string()),
        external_payment_id: Some(record.id.clone()).filter(|id| !id.is_empty()),
        payment_method: record.payment_method_id.clone(),
        amount_cents: record.amount_cents(),
        currency: record.currency_id.clone(),
    }
}
