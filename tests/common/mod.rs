//! Shared wiring for the integration tests: the full billing stack over the
//! in-memory adapters.

#![allow(dead_code)]

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::Value;

use marketplace_billing::adapters::catalog::StaticPlanCatalog;
use marketplace_billing::adapters::http::{BillingAppState, BillingPorts, BillingSettings};
use marketplace_billing::adapters::memory::{
    InMemoryAuditLog, InMemoryBillingStore, InMemoryBusinessDirectory, RecordingCacheInvalidator,
};
use marketplace_billing::adapters::mercadopago::MockPaymentGateway;
use marketplace_billing::application::handlers::billing::{
    CheckoutSettings, HandlePaymentNotificationCommand,
};
use marketplace_billing::domain::billing::signature::compute_signature;
use marketplace_billing::domain::billing::{Payment, PlanType};
use marketplace_billing::domain::foundation::{BusinessId, Timestamp, UserId};
use marketplace_billing::ports::{BackUrls, GatewayRecord};

pub const SECRET: &str = "it_webhook_secret";
pub const TS: &str = "1704067200";
pub const OWNER: &str = "owner-1";
pub const ADMIN: &str = "admin-1";

pub struct TestApp {
    pub store: InMemoryBillingStore,
    pub gateway: MockPaymentGateway,
    pub cache: RecordingCacheInvalidator,
    pub audit: InMemoryAuditLog,
    pub business_id: BusinessId,
    pub state: BillingAppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = InMemoryBillingStore::new();
        let gateway = MockPaymentGateway::new();
        let cache = RecordingCacheInvalidator::new();
        let audit = InMemoryAuditLog::new();
        let business_id = BusinessId::new();
        let directory = InMemoryBusinessDirectory::new()
            .with_owner(UserId::new(OWNER).unwrap(), business_id)
            .with_admin(UserId::new(ADMIN).unwrap());

        let ports = BillingPorts {
            payments: Arc::new(store.clone()),
            plans: Arc::new(store.clone()),
            trials: Arc::new(store.clone()),
            unit_of_work: Arc::new(store.clone()),
            webhook_events: Arc::new(store.clone()),
            gateway: Arc::new(gateway.clone()),
            catalog: Arc::new(StaticPlanCatalog::with_defaults("ARS")),
            cache: Arc::new(cache.clone()),
            audit_log: Arc::new(audit.clone()),
            businesses: Arc::new(directory),
        };
        let settings = BillingSettings {
            webhook_secret: SecretString::new(SECRET.to_string()),
            checkout: CheckoutSettings {
                notification_url: "https://billing.example.com/webhooks/mercadopago".to_string(),
                back_urls: BackUrls::default(),
            },
            subscription_days: 30,
            trial_days: 14,
        };

        Self {
            store,
            gateway,
            cache,
            audit,
            business_id,
            state: BillingAppState::new(ports, settings),
        }
    }

    /// Seeds a pending BASIC payment for the test business.
    pub fn pending_payment(&self) -> Payment {
        let payment = Payment::open(self.business_id, PlanType::Basic, 500_000, "ARS", Timestamp::now());
        self.store.seed_payment(payment.clone());
        payment
    }

    /// Makes the gateway report `status` for external payment `external_id`.
    pub fn gateway_reports(&self, external_id: &str, status: &str, payment: &Payment) {
        self.gateway.set_payment(GatewayRecord {
            id: external_id.to_string(),
            status: Some(status.to_string()),
            transaction_amount: Some(5000.0),
            currency_id: Some("ARS".to_string()),
            payment_method_id: Some("visa".to_string()),
            external_reference: Some(payment.id.to_string()),
            ..Default::default()
        });
    }
}

pub fn signature_for(external_id: &str, request_id: Option<&str>) -> String {
    format!(
        "ts={},v1={}",
        TS,
        compute_signature(SECRET, external_id, request_id, TS)
    )
}

pub fn payment_body(external_id: &str) -> Value {
    serde_json::json!({
        "type": "payment",
        "action": "payment.updated",
        "data": { "id": external_id }
    })
}

pub fn signed_notification(external_id: &str, request_id: Option<&str>) -> HandlePaymentNotificationCommand {
    HandlePaymentNotificationCommand {
        source: "mercadopago".to_string(),
        raw_body: payment_body(external_id).to_string().into_bytes(),
        signature_header: Some(signature_for(external_id, request_id)),
        request_id: request_id.map(str::to_string),
    }
}
