//! PaymentRepository port - persistence for payments.
//!
//! Status changes do not go through this port; they are applied by
//! `BillingUnitOfWork` together with the plan and ledger writes.

use async_trait::async_trait;

use crate::domain::billing::Payment;
use crate::domain::foundation::{DomainError, PaymentId};

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Inserts a newly opened payment.
    async fn insert(&self, payment: &Payment) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &PaymentId) -> Result<Option<Payment>, DomainError>;

    /// Looks up a payment by the processor-side id stored on it.
    async fn find_by_external_payment_id(
        &self,
        external_payment_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Stores the checkout session id returned by the gateway.
    async fn set_external_payment_id(
        &self,
        id: &PaymentId,
        external_payment_id: &str,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn PaymentRepository) {}
    }
}
