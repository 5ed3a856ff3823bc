//! Gateway reconciler - fetches the processor's authoritative payment record.
//!
//! Webhook bodies are never trusted for money-moving decisions: the signature
//! proves who delivered the notification, this lookup proves what it says.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::{GatewayRecord, PaymentGateway};

pub struct GatewayReconciler {
    gateway: Arc<dyn PaymentGateway>,
}

impl GatewayReconciler {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Reads the payment record from the processor.
    ///
    /// # Errors
    ///
    /// `GatewayUnavailable` on transport or not-found failures; the caller
    /// treats it as "cannot reconcile yet".
    pub async fn fetch_authoritative(&self, external_payment_id: &str) -> Result<GatewayRecord, BillingError> {
        let external_payment_id = external_payment_id.trim();
        if external_payment_id.is_empty() {
            return Err(BillingError::Validation("external payment id is empty".to_string()));
        }

        let record = self.gateway.get_payment(external_payment_id).await?;

        tracing::debug!(
            external_payment_id,
            status = record.status.as_deref().unwrap_or(""),
            "Fetched authoritative payment record"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mercadopago::MockPaymentGateway;
    use crate::ports::GatewayError;

    #[tokio::test]
    async fn returns_gateway_record() {
        let gateway = MockPaymentGateway::new();
        gateway.set_payment(GatewayRecord {
            id: "123".into(),
            status: Some("approved".into()),
            ..Default::default()
        });
        let reconciler = GatewayReconciler::new(Arc::new(gateway));

        let record = reconciler.fetch_authoritative(" 123 ").await.unwrap();
        assert_eq!(record.status.as_deref(), Some("approved"));
    }

    #[tokio::test]
    async fn transport_failure_is_gateway_unavailable() {
        let gateway = MockPaymentGateway::new();
        gateway.set_error(GatewayError::timeout("deadline"));
        let reconciler = GatewayReconciler::new(Arc::new(gateway));

        let err = reconciler.fetch_authoritative("123").await.unwrap_err();
        assert!(matches!(err, BillingError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn unknown_payment_is_gateway_unavailable() {
        let reconciler = GatewayReconciler::new(Arc::new(MockPaymentGateway::new()));
        let err = reconciler.fetch_authoritative("404").await.unwrap_err();
        assert!(matches!(err, BillingError::GatewayUnavailable(_)));
    }

    #[tokio::test]
    async fn empty_id_is_rejected_without_calling_gateway() {
        let gateway = MockPaymentGateway::new();
        let reconciler = GatewayReconciler::new(Arc::new(gateway.clone()));

        assert!(reconciler.fetch_authoritative("  ").await.is_err());
        assert_eq!(gateway.call_count("get_payment"), 0);
    }
}
