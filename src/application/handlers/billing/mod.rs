//! Billing handlers.
//!
//! ## Webhook path
//! - Recording deliveries in the idempotency ledger
//! - Fetching the authoritative payment record from the gateway
//! - Applying normalized outcomes to payments and plans
//! - Orchestrating inbound notifications end to end
//!
//! ## Synchronous path
//! - Opening payment intents
//! - Starting and granting trials
//! - Reading the current plan
//!
//! ## Operations
//! - Listing and replaying unprocessed events
//! - Purging old ledger rows
//! - Expiring lapsed plans

mod apply_payment_outcome;
mod create_payment_intent;
mod expire_lapsed_plans;
mod gateway_reconciler;
mod get_current_plan;
mod handle_payment_notification;
mod idempotency_ledger;
mod process_payment_notification;
mod purge_webhook_events;
mod replay_webhook_event;
mod trial_manager;

// Webhook path
pub use apply_payment_outcome::{
    ApplyPaymentOutcomeCommand, ApplyPaymentOutcomeHandler, ApplyPaymentOutcomeResult,
};
pub use gateway_reconciler::GatewayReconciler;
pub use handle_payment_notification::{HandlePaymentNotificationCommand, HandlePaymentNotificationHandler};
pub use idempotency_ledger::{
    canonical_json, derive_request_id, DerivedRequestId, IdempotencyLedger, LedgerAttempt,
    RecordAttemptCommand,
};
pub use process_payment_notification::{NotificationOutcome, PaymentNotificationProcessor};

// Synchronous path
pub use create_payment_intent::{
    CheckoutSettings, CreatePaymentIntentCommand, CreatePaymentIntentHandler, PaymentIntent,
};
pub use get_current_plan::{GetCurrentPlanHandler, GetCurrentPlanQuery};
pub use trial_manager::{GrantTrialCommand, StartTrialCommand, TrialManager};

// Operations
pub use expire_lapsed_plans::ExpireLapsedPlansHandler;
pub use purge_webhook_events::PurgeWebhookEventsHandler;
pub use replay_webhook_event::{
    ListUnprocessedWebhookEventsHandler, ReplayWebhookEventCommand, ReplayWebhookEventHandler,
};
