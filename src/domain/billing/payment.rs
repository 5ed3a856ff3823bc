//! Payment entity and its status lifecycle.
//!
//! A payment is opened `pending` by the intent issuer and resolved exactly once
//! to `approved` or `rejected` by the subscription state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    BusinessId, PaymentId, StateMachine, Timestamp, ValidationError,
};

use super::PlanType;

/// Internal payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Pending) | (Pending, Approved) | (Pending, Rejected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Pending, Approved, Rejected],
            Approved | Rejected => vec![],
        }
    }
}

/// Authoritative values copied from the processor when a payment resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub external_status: String,
    pub external_payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

/// A payment a business opened to move to a paid plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub business_id: BusinessId,
    pub plan: PlanType,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub external_status: String,
    /// Checkout session id until the processor reports the real payment id.
    pub external_payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    /// Opens a new pending payment for a plan upgrade.
    pub fn open(
        business_id: BusinessId,
        plan: PlanType,
        amount_cents: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            business_id,
            plan,
            amount_cents,
            currency: currency.into(),
            status: PaymentStatus::Pending,
            external_status: String::new(),
            external_payment_id: None,
            payment_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// Resolves the payment to `target`, copying the processor's authoritative values.
    ///
    /// Amount and currency are only overwritten on approval; a rejected payment
    /// keeps the originally requested amount.
    pub fn resolve(
        &mut self,
        target: PaymentStatus,
        settlement: &Settlement,
        now: Timestamp,
    ) -> Result<(), ValidationError> {
        self.status = self.status.transition_to(target)?;
        self.external_status = settlement.external_status.clone();
        if let Some(id) = &settlement.external_payment_id {
            self.external_payment_id = Some(id.clone());
        }
        if settlement.payment_method.is_some() {
            self.payment_method = settlement.payment_method.clone();
        }
        if target == PaymentStatus::Approved {
            if let Some(amount) = settlement.amount_cents {
                self.amount_cents = amount;
            }
            if let Some(currency) = &settlement.currency {
                self.currency = currency.clone();
            }
        }
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settlement(status: &str) -> Settlement {
        Settlement {
            external_status: status.to_string(),
            external_payment_id: Some("123456".to_string()),
            payment_method: Some("visa".to_string()),
            amount_cents: Some(2500),
            currency: Some("USD".to_string()),
        }
    }

    fn pending_payment() -> Payment {
        Payment::open(BusinessId::new(), PlanType::Basic, 1999, "ARS", Timestamp::now())
    }

    // ══════════════════════════════════════════════════════════════
    // Status Transitions
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_can_resolve_either_way() {
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Approved));
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Rejected));
        assert!(PaymentStatus::Pending.can_transition_to(&PaymentStatus::Pending));
    }

    #[test]
    fn resolved_statuses_are_terminal() {
        assert!(PaymentStatus::Approved.is_terminal());
        assert!(PaymentStatus::Rejected.is_terminal());
        assert!(!PaymentStatus::Approved.can_transition_to(&PaymentStatus::Rejected));
        assert!(!PaymentStatus::Rejected.can_transition_to(&PaymentStatus::Approved));
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [PaymentStatus::Pending, PaymentStatus::Approved, PaymentStatus::Rejected] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Resolution
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn new_payment_is_pending_without_external_id() {
        let payment = pending_payment();
        assert!(payment.is_pending());
        assert!(payment.external_payment_id.is_none());
    }

    #[test]
    fn approval_takes_authoritative_amount() {
        let mut payment = pending_payment();

        payment
            .resolve(PaymentStatus::Approved, &settlement("approved"), Timestamp::now())
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Approved);
        assert_eq!(payment.amount_cents, 2500);
        assert_eq!(payment.currency, "USD");
        assert_eq!(payment.payment_method.as_deref(), Some("visa"));
        assert_eq!(payment.external_payment_id.as_deref(), Some("123456"));
    }

    #[test]
    fn rejection_keeps_requested_amount() {
        let mut payment = pending_payment();

        payment
            .resolve(PaymentStatus::Rejected, &settlement("rejected"), Timestamp::now())
            .unwrap();

        assert_eq!(payment.status, PaymentStatus::Rejected);
        assert_eq!(payment.amount_cents, 1999);
        assert_eq!(payment.external_status, "rejected");
    }

    #[test]
    fn approved_payment_cannot_be_rejected() {
        let mut payment = pending_payment();
        payment
            .resolve(PaymentStatus::Approved, &settlement("approved"), Timestamp::now())
            .unwrap();

        let result = payment.resolve(PaymentStatus::Rejected, &settlement("rejected"), Timestamp::now());

        assert!(result.is_err());
        assert_eq!(payment.status, PaymentStatus::Approved);
    }
}
