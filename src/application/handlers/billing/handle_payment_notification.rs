//! HandlePaymentNotificationHandler - the webhook orchestrator.
//!
//! Verifies the delivery, passes it through the idempotency gate and hands
//! new payment notifications to the processor. Never fails: every path ends
//! in a `NotificationOutcome` that the HTTP layer acknowledges with 200.

use std::sync::Arc;

use crate::domain::billing::{BillingError, PaymentNotification, SignatureVerifier};

use super::idempotency_ledger::{IdempotencyLedger, RecordAttemptCommand};
use super::process_payment_notification::{NotificationOutcome, PaymentNotificationProcessor};

/// An inbound delivery as received over HTTP.
#[derive(Debug, Clone)]
pub struct HandlePaymentNotificationCommand {
    /// Processor path segment (e.g. "mercadopago").
    pub source: String,
    pub raw_body: Vec<u8>,
    pub signature_header: Option<String>,
    pub request_id: Option<String>,
}

pub struct HandlePaymentNotificationHandler {
    verifier: SignatureVerifier,
    ledger: Arc<IdempotencyLedger>,
    processor: Arc<PaymentNotificationProcessor>,
}

impl HandlePaymentNotificationHandler {
    pub fn new(
        verifier: SignatureVerifier,
        ledger: Arc<IdempotencyLedger>,
        processor: Arc<PaymentNotificationProcessor>,
    ) -> Self {
        Self {
            verifier,
            ledger,
            processor,
        }
    }

    pub async fn handle(&self, cmd: HandlePaymentNotificationCommand) -> NotificationOutcome {
        let request_id = cmd
            .request_id
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let notification = match PaymentNotification::parse(&cmd.raw_body) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(source = %cmd.source, error = %e, "Unparseable notification body");
                return NotificationOutcome::Rejected(BillingError::Validation(e.to_string()));
            }
        };

        // 1. Authenticity of the delivery
        let signed = self.verifier.verify(
            cmd.signature_header.as_deref().unwrap_or(""),
            notification.external_id.as_deref().unwrap_or(""),
            request_id.as_deref().unwrap_or(""),
        );
        if !signed {
            tracing::warn!(
                source = %cmd.source,
                request_id = request_id.as_deref().unwrap_or(""),
                external_payment_id = notification.external_id.as_deref().unwrap_or(""),
                "Webhook signature verification failed"
            );
            return NotificationOutcome::Rejected(BillingError::AuthenticationFailure);
        }

        // 2. Idempotency gate
        let attempt = self
            .ledger
            .record_attempt(RecordAttemptCommand {
                source: cmd.source.clone(),
                request_id,
                event_type: notification.event_type.clone(),
                external_id: notification.external_id.clone(),
                payload: notification.raw.clone(),
            })
            .await;

        let attempt = match attempt {
            Ok(attempt) => attempt,
            Err(e) => {
                let err = BillingError::from(e);
                tracing::error!(
                    source = %cmd.source,
                    alert = err.is_alerting(),
                    error = %err,
                    "Failed to record webhook delivery"
                );
                return NotificationOutcome::Failed(err);
            }
        };

        if attempt.already_seen {
            tracing::debug!(request_id = %attempt.request_id, "Duplicate webhook delivery ignored");
            return NotificationOutcome::Duplicate;
        }

        // 3. Reconcile and apply
        let outcome = self.processor.process(&attempt.request_id, &notification).await;
        tracing::info!(
            request_id = %attempt.request_id,
            outcome = outcome.as_str(),
            "Webhook notification handled"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mercadopago::MockPaymentGateway;
    use crate::adapters::memory::{InMemoryBillingStore, NoopCacheInvalidator};
    use crate::application::handlers::billing::{ApplyPaymentOutcomeHandler, GatewayReconciler};
    use crate::domain::billing::signature::compute_signature;
    use crate::domain::billing::{Payment, PaymentStatus, PlanType};
    use crate::domain::foundation::{BusinessId, Timestamp};
    use crate::ports::GatewayRecord;
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "whsec_test";

    struct Fixture {
        store: InMemoryBillingStore,
        gateway: MockPaymentGateway,
        handler: HandlePaymentNotificationHandler,
    }

    fn fixture() -> Fixture {
        let store = InMemoryBillingStore::new();
        let gateway = MockPaymentGateway::new();
        let ledger = Arc::new(IdempotencyLedger::new(Arc::new(store.clone())));
        let processor = Arc::new(PaymentNotificationProcessor::new(
            ledger.clone(),
            GatewayReconciler::new(Arc::new(gateway.clone())),
            Arc::new(store.clone()),
            ApplyPaymentOutcomeHandler::new(
                Arc::new(store.clone()),
                Arc::new(NoopCacheInvalidator),
                30,
            ),
        ));
        let handler = HandlePaymentNotificationHandler::new(
            SignatureVerifier::new(SecretString::new(SECRET.to_string())),
            ledger,
            processor,
        );
        Fixture { store, gateway, handler }
    }

    fn signed_command(external_id: &str, request_id: Option<&str>, body: serde_json::Value) -> HandlePaymentNotificationCommand {
        let ts = "1704067200";
        let sig = compute_signature(SECRET, external_id, request_id, ts);
        HandlePaymentNotificationCommand {
            source: "mercadopago".to_string(),
            raw_body: body.to_string().into_bytes(),
            signature_header: Some(format!("ts={},v1={}", ts, sig)),
            request_id: request_id.map(str::to_string),
        }
    }

    fn approved_payment(f: &Fixture) -> Payment {
        let payment = Payment::open(BusinessId::new(), PlanType::Basic, 500_000, "ARS", Timestamp::now());
        f.store.seed_payment(payment.clone());
        f.gateway.set_payment(GatewayRecord {
            id: "777".into(),
            status: Some("approved".into()),
            external_reference: Some(payment.id.to_string()),
            transaction_amount: Some(5000.0),
            currency_id: Some("ARS".into()),
            ..Default::default()
        });
        payment
    }

    #[tokio::test]
    async fn invalid_signature_records_nothing() {
        let f = fixture();
        let mut cmd = signed_command("777", Some("req-1"), json!({ "type": "payment", "data": { "id": "777" } }));
        cmd.signature_header = Some("ts=1,v1=deadbeef".to_string());

        let outcome = f.handler.handle(cmd).await;

        assert!(matches!(outcome, NotificationOutcome::Rejected(BillingError::AuthenticationFailure)));
        assert!(f.store.webhook_events().is_empty());
    }

    #[tokio::test]
    async fn missing_signature_header_is_rejected() {
        let f = fixture();
        let mut cmd = signed_command("777", Some("req-1"), json!({ "type": "payment", "data": { "id": "777" } }));
        cmd.signature_header = None;

        assert!(matches!(f.handler.handle(cmd).await, NotificationOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let f = fixture();
        let mut cmd = signed_command("777", Some("req-1"), json!({}));
        cmd.raw_body = b"{not json".to_vec();

        assert!(matches!(
            f.handler.handle(cmd).await,
            NotificationOutcome::Rejected(BillingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn approved_notification_is_applied() {
        let f = fixture();
        let payment = approved_payment(&f);

        let outcome = f
            .handler
            .handle(signed_command("777", Some("req-1"), json!({ "type": "payment", "data": { "id": "777" } })))
            .await;

        assert!(matches!(outcome, NotificationOutcome::Applied { status: PaymentStatus::Approved, .. }));
        assert_eq!(f.store.payment(&payment.id).unwrap().status, PaymentStatus::Approved);
        assert!(f.store.webhook_event("req-1").unwrap().processed);
    }

    #[tokio::test]
    async fn second_delivery_is_duplicate() {
        let f = fixture();
        approved_payment(&f);
        let body = json!({ "type": "payment", "data": { "id": "777" } });

        f.handler.handle(signed_command("777", Some("req-1"), body.clone())).await;
        let again = f.handler.handle(signed_command("777", Some("req-1"), body)).await;

        assert!(matches!(again, NotificationOutcome::Duplicate));
        assert_eq!(f.gateway.call_count("get_payment"), 1);
    }

    #[tokio::test]
    async fn delivery_without_request_id_is_deduplicated_by_payload() {
        let f = fixture();
        approved_payment(&f);
        let body = json!({ "type": "payment", "data": { "id": "777" } });

        f.handler.handle(signed_command("777", None, body.clone())).await;
        let again = f.handler.handle(signed_command("777", None, body)).await;

        assert!(matches!(again, NotificationOutcome::Duplicate));
        assert_eq!(f.store.webhook_events().len(), 1);
    }

    #[tokio::test]
    async fn ledger_failure_is_reported() {
        let f = fixture();
        f.store.fail_next_ledger_insert();

        let outcome = f
            .handler
            .handle(signed_command("777", Some("req-1"), json!({ "type": "payment", "data": { "id": "777" } })))
            .await;

        assert!(matches!(outcome, NotificationOutcome::Failed(_)));
        assert!(outcome.error().is_some());
    }
}
