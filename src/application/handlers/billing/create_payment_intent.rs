//! CreatePaymentIntentHandler - opens a payment and a hosted checkout.
//!
//! The pending payment is stored before the gateway is called, so a
//! notification that races ahead of the synchronous response can still be
//! resolved to it.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::billing::{BillingError, Payment, PlanType};
use crate::domain::foundation::{BusinessId, PaymentId, Timestamp};
use crate::ports::{BackUrls, PaymentGateway, PaymentRepository, PlanCatalog, PreferenceItem, PreferenceRequest};

/// Checkout settings shared by every intent.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Callback the processor notifies (`<public_base_url>/webhooks/<processor>`).
    pub notification_url: String,
    pub back_urls: BackUrls,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentIntentCommand {
    pub business_id: BusinessId,
    pub plan_type: PlanType,
}

/// Result of opening an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentIntent {
    /// Free tier: no payment needed.
    NotRequired,
    Checkout {
        payment_id: PaymentId,
        preference_id: String,
        init_point: String,
        sandbox_init_point: Option<String>,
    },
}

pub struct CreatePaymentIntentHandler {
    payments: Arc<dyn PaymentRepository>,
    catalog: Arc<dyn PlanCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
}

impl CreatePaymentIntentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        catalog: Arc<dyn PlanCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            payments,
            catalog,
            gateway,
            settings,
        }
    }

    pub async fn handle(&self, cmd: CreatePaymentIntentCommand) -> Result<PaymentIntent, BillingError> {
        if !cmd.plan_type.is_paid() {
            return Ok(PaymentIntent::NotRequired);
        }

        let plan = self
            .catalog
            .find(cmd.plan_type)
            .await?
            .ok_or_else(|| BillingError::PlanNotFound(cmd.plan_type.to_string()))?;

        // 1. Payment row first
        let payment = Payment::open(
            cmd.business_id,
            plan.plan_type,
            plan.price_cents,
            plan.currency.clone(),
            Timestamp::now(),
        );
        self.payments.insert(&payment).await?;

        // 2. Checkout session
        let mut metadata = BTreeMap::new();
        metadata.insert("business_id".to_string(), cmd.business_id.to_string());
        metadata.insert("payment_id".to_string(), payment.id.to_string());

        let request = PreferenceRequest {
            items: vec![PreferenceItem {
                id: payment.id.to_string(),
                title: format!("Plan {}", plan.plan_type.display_name()),
                quantity: 1,
                unit_price: plan.unit_price(),
                currency_id: plan.currency.clone(),
            }],
            metadata,
            back_urls: self.settings.back_urls.clone(),
            external_reference: payment.id.to_string(),
            notification_url: self.settings.notification_url.clone(),
        };

        let preference = self.gateway.create_preference(request).await.map_err(|e| {
            tracing::warn!(
                payment_id = %payment.id,
                business_id = %cmd.business_id,
                error = %e,
                "Checkout preference creation failed, payment stays pending"
            );
            BillingError::from(e)
        })?;

        // 3. Remember the session id for lookups by external id
        self.payments
            .set_external_payment_id(&payment.id, &preference.id)
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            business_id = %cmd.business_id,
            plan = %plan.plan_type,
            preference_id = %preference.id,
            "Payment intent created"
        );

        Ok(PaymentIntent::Checkout {
            payment_id: payment.id,
            preference_id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
        })
    }
}
