//! PaymentNotificationProcessor - reconciles a recorded notification.
//!
//! Runs everything after the idempotency gate: filter non-payment events,
//! fetch the authoritative record, resolve the internal payment, normalize
//! the status and apply it. Shared by live deliveries and manual replay.

use std::str::FromStr;
use std::sync::Arc;

use crate::domain::billing::{normalize, BillingError, Payment, PaymentNotification, PaymentStatus};
use crate::domain::foundation::PaymentId;
use crate::ports::{GatewayRecord, PaymentRepository};

use super::apply_payment_outcome::{
    ApplyPaymentOutcomeCommand, ApplyPaymentOutcomeHandler, ApplyPaymentOutcomeResult,
};
use super::gateway_reconciler::GatewayReconciler;
use super::idempotency_ledger::IdempotencyLedger;

/// What happened to a notification.
#[derive(Debug, Clone)]
pub enum NotificationOutcome {
    /// The payment transition committed.
    Applied {
        payment_id: PaymentId,
        status: PaymentStatus,
    },
    /// The payment was already terminal; the event was marked processed.
    AlreadyTerminal { payment_id: PaymentId },
    /// The delivery was seen before.
    Duplicate,
    /// Not a payment event; acknowledged without business action.
    Ignored,
    /// Could not reconcile yet; the event stays unprocessed for replay.
    LeftUnprocessed(BillingError),
    /// Authentication or payload failure; nothing was recorded.
    Rejected(BillingError),
    /// Internal failure.
    Failed(BillingError),
}

impl NotificationOutcome {
    /// Short label for logs and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Applied { .. } => "applied",
            NotificationOutcome::AlreadyTerminal { .. } => "already_terminal",
            NotificationOutcome::Duplicate => "duplicate",
            NotificationOutcome::Ignored => "ignored",
            NotificationOutcome::LeftUnprocessed(_) => "left_unprocessed",
            NotificationOutcome::Rejected(_) => "rejected",
            NotificationOutcome::Failed(_) => "failed",
        }
    }

    /// Error to report in the acknowledgement body, if any.
    ///
    /// Reconciliation that could not finish is still acknowledged as received.
    pub fn error(&self) -> Option<&BillingError> {
        match self {
            NotificationOutcome::Rejected(err) | NotificationOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct PaymentNotificationProcessor {
    ledger: Arc<IdempotencyLedger>,
    reconciler: GatewayReconciler,
    payments: Arc<dyn PaymentRepository>,
    state_machine: ApplyPaymentOutcomeHandler,
}

impl PaymentNotificationProcessor {
    pub fn new(
        ledger: Arc<IdempotencyLedger>,
        reconciler: GatewayReconciler,
        payments: Arc<dyn PaymentRepository>,
        state_machine: ApplyPaymentOutcomeHandler,
    ) -> Self {
        Self {
            ledger,
            reconciler,
            payments,
            state_machine,
        }
    }

    /// Processes a notification already recorded under `request_id`.
    pub async fn process(&self, request_id: &str, notification: &PaymentNotification) -> NotificationOutcome {
        if !notification.is_payment_related() {
            return match self.ledger.mark_processed(request_id).await {
                Ok(()) => {
                    tracing::debug!(
                        request_id,
                        event_type = %notification.event_type,
                        "Non-payment notification acknowledged"
                    );
                    NotificationOutcome::Ignored
                }
                Err(e) => failed(request_id, e.into()),
            };
        }

        let Some(external_id) = notification.external_id.as_deref() else {
            tracing::warn!(request_id, "Payment notification without data.id left unprocessed");
            return NotificationOutcome::LeftUnprocessed(BillingError::unresolved(""));
        };

        let record = match self.reconciler.fetch_authoritative(external_id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    request_id,
                    external_payment_id = external_id,
                    error = %e,
                    "Gateway lookup failed, event left unprocessed"
                );
                return NotificationOutcome::LeftUnprocessed(e);
            }
        };

        let payment = match self.resolve_payment(&record, notification, external_id).await {
            Ok(payment) => payment,
            Err(e) if e.is_alerting() => return failed(request_id, e),
            Err(e) => {
                tracing::warn!(
                    request_id,
                    external_payment_id = external_id,
                    error = %e,
                    "Could not resolve payment, event left unprocessed"
                );
                return NotificationOutcome::LeftUnprocessed(e);
            }
        };

        let raw_status = record
            .status
            .as_deref()
            .or(notification.status.as_deref())
            .unwrap_or("");
        let outcome = normalize(raw_status);
        let payment_id = payment.id;

        let result = self
            .state_machine
            .handle(ApplyPaymentOutcomeCommand {
                outcome,
                payment,
                gateway_record: record,
                webhook_request_id: Some(request_id.to_string()),
            })
            .await;

        match result {
            Ok(ApplyPaymentOutcomeResult::Applied { payment, .. }) => NotificationOutcome::Applied {
                payment_id,
                status: payment.status,
            },
            Ok(ApplyPaymentOutcomeResult::AlreadyTerminal) => {
                NotificationOutcome::AlreadyTerminal { payment_id }
            }
            Err(e) => failed(request_id, e),
        }
    }

    /// Finds the internal payment a notification refers to.
    ///
    /// Candidates in order: the gateway's `external_reference`, the gateway's
    /// echoed `metadata.payment_id`, the payload's `external_reference`, the
    /// payload's `metadata.payment_id`, and finally the stored external
    /// payment id. The first candidate that is a valid
    /// payment id wins.
    async fn resolve_payment(
        &self,
        record: &GatewayRecord,
        notification: &PaymentNotification,
        external_id: &str,
    ) -> Result<Payment, BillingError> {
        let candidates = [
            record.external_reference.clone(),
            record.metadata_payment_id(),
            notification.external_reference.clone(),
            notification.metadata_payment_id(),
        ];

        if let Some(payment_id) = candidates
            .iter()
            .flatten()
            .find_map(|candidate| PaymentId::from_str(candidate).ok())
        {
            return self
                .payments
                .find_by_id(&payment_id)
                .await?
                .ok_or_else(|| BillingError::not_found("Payment", payment_id));
        }

        self.payments
            .find_by_external_payment_id(external_id)
            .await?
            .ok_or_else(|| BillingError::unresolved(external_id))
    }
}

fn failed(request_id: &str, err: BillingError) -> NotificationOutcome {
    tracing::error!(
        request_id,
        alert = err.is_alerting(),
        error = %err,
        "Notification processing failed"
    );
    NotificationOutcome::Failed(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mercadopago::MockPaymentGateway;
    use crate::adapters::memory::{InMemoryBillingStore, NoopCacheInvalidator};
    use crate::domain::billing::PlanType;
    use crate::domain::foundation::{BusinessId, Timestamp};
    use crate::ports::{WebhookEventRecord, WebhookEventRepository};
    use serde_json::json;

    struct Fixture {
        store: InMemoryBillingStore,
        gateway: MockPaymentGateway,
        processor: PaymentNotificationProcessor,
    }

    fn fixture() -> Fixture {
        let store = InMemoryBillingStore::new();
        let gateway = MockPaymentGateway::new();
        let ledger = Arc::new(IdempotencyLedger::new(Arc::new(store.clone())));
        let processor = PaymentNotificationProcessor::new(
            ledger,
            GatewayReconciler::new(Arc::new(gateway.clone())),
            Arc::new(store.clone()),
            ApplyPaymentOutcomeHandler::new(
                Arc::new(store.clone()),
                Arc::new(NoopCacheInvalidator),
                30,
            ),
        );
        Fixture { store, gateway, processor }
    }

    async fn recorded(store: &InMemoryBillingStore, payload: serde_json::Value) -> PaymentNotification {
        let row = WebhookEventRecord::received("req-1", "req-1", "mercadopago", "payment", None, payload.clone());
        WebhookEventRepository::insert(store, row).await.unwrap();
        PaymentNotification::from_value(payload).unwrap()
    }

    fn seeded_payment(store: &InMemoryBillingStore) -> Payment {
        let payment = Payment::open(BusinessId::new(), PlanType::Premium, 1_200_000, "ARS", Timestamp::now());
        store.seed_payment(payment.clone());
        payment
    }

    fn gateway_payment(id: &str, status: &str, reference: Option<String>) -> GatewayRecord {
        GatewayRecord {
            id: id.to_string(),
            status: Some(status.to_string()),
            external_reference: reference,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn non_payment_event_is_marked_processed() {
        let f = fixture();
        let n = recorded(&f.store, json!({ "type": "merchant_order", "data": { "id": "1" } })).await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::Ignored));
        assert!(f.store.webhook_event("req-1").unwrap().processed);
        assert_eq!(f.gateway.call_count("get_payment"), 0);
    }

    #[tokio::test]
    async fn gateway_failure_leaves_event_unprocessed() {
        let f = fixture();
        let n = recorded(&f.store, json!({ "type": "payment", "data": { "id": "55" } })).await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::LeftUnprocessed(BillingError::GatewayUnavailable(_))));
        assert!(outcome.error().is_none());
        assert!(!f.store.webhook_event("req-1").unwrap().processed);
    }

    #[tokio::test]
    async fn gateway_reference_wins_over_payload_reference() {
        let f = fixture();
        let target = seeded_payment(&f.store);
        let decoy = seeded_payment(&f.store);
        f.gateway.set_payment(gateway_payment("55", "approved", Some(target.id.to_string())));
        let n = recorded(
            &f.store,
            json!({ "type": "payment", "data": { "id": "55" }, "external_reference": decoy.id.to_string() }),
        )
        .await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::Applied { payment_id, .. } if payment_id == target.id));
        assert!(f.store.payment(&decoy.id).unwrap().is_pending());
    }

    #[tokio::test]
    async fn metadata_payment_id_is_used_when_references_are_missing() {
        let f = fixture();
        let payment = seeded_payment(&f.store);
        f.gateway.set_payment(gateway_payment("55", "rejected", None));
        let n = recorded(
            &f.store,
            json!({ "type": "payment", "data": { "id": "55" }, "metadata": { "payment_id": payment.id.to_string() } }),
        )
        .await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::Applied { status: PaymentStatus::Rejected, .. }));
    }

    #[tokio::test]
    async fn gateway_metadata_payment_id_resolves_payment() {
        let f = fixture();
        let target = seeded_payment(&f.store);
        let decoy = seeded_payment(&f.store);
        let mut record = gateway_payment("56", "approved", None);
        record.metadata = Some(json!({ "payment_id": target.id.to_string() }));
        f.gateway.set_payment(record);
        let n = recorded(
            &f.store,
            json!({ "type": "payment", "data": { "id": "56" }, "external_reference": decoy.id.to_string() }),
        )
        .await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::Applied { payment_id, .. } if payment_id == target.id));
        assert!(f.store.payment(&decoy.id).unwrap().is_pending());
    }

    #[tokio::test]
    async fn stored_external_id_is_the_last_resort() {
        let f = fixture();
        let mut payment = Payment::open(BusinessId::new(), PlanType::Basic, 500_000, "ARS", Timestamp::now());
        payment.external_payment_id = Some("55".to_string());
        f.store.seed_payment(payment.clone());
        f.gateway.set_payment(gateway_payment("55", "approved", Some("not-a-uuid".to_string())));
        let n = recorded(&f.store, json!({ "type": "payment", "data": { "id": "55" } })).await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::Applied { payment_id, .. } if payment_id == payment.id));
    }

    #[tokio::test]
    async fn unresolvable_reference_leaves_event_unprocessed() {
        let f = fixture();
        f.gateway.set_payment(gateway_payment("55", "approved", None));
        let n = recorded(&f.store, json!({ "type": "payment", "data": { "id": "55" } })).await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::LeftUnprocessed(BillingError::UnresolvedReference { .. })));
        assert!(!f.store.webhook_event("req-1").unwrap().processed);
    }

    #[tokio::test]
    async fn referenced_payment_missing_leaves_event_unprocessed() {
        let f = fixture();
        f.gateway.set_payment(gateway_payment("55", "approved", Some(PaymentId::new().to_string())));
        let n = recorded(&f.store, json!({ "type": "payment", "data": { "id": "55" } })).await;

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(outcome, NotificationOutcome::LeftUnprocessed(BillingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn payload_status_is_used_when_gateway_has_none() {
        let f = fixture();
        let payment = seeded_payment(&f.store);
        f.gateway.set_payment(GatewayRecord {
            id: "55".into(),
            status: None,
            external_reference: Some(payment.id.to_string()),
            ..Default::default()
        });
        let n = recorded(&f.store, json!({ "type": "payment", "status": "cancelled", "data": { "id": "55" } })).await;

        f.processor.process("req-1", &n).await;

        assert_eq!(f.store.payment(&payment.id).unwrap().status, PaymentStatus::Rejected);
    }

    #[tokio::test]
    async fn persistence_failure_is_reported_as_failed() {
        let f = fixture();
        let payment = seeded_payment(&f.store);
        f.gateway.set_payment(gateway_payment("55", "approved", Some(payment.id.to_string())));
        let n = recorded(&f.store, json!({ "type": "payment", "data": { "id": "55" } })).await;
        f.store.fail_next_plan_write();

        let outcome = f.processor.process("req-1", &n).await;

        assert!(matches!(&outcome, NotificationOutcome::Failed(e) if e.is_alerting()));
        assert!(outcome.error().is_some());
        assert!(!f.store.webhook_event("req-1").unwrap().processed);
    }
}
