//! Axum router configuration for billing endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_checkout, get_current_plan, grant_trial, list_unprocessed_webhooks,
    receive_payment_notification, replay_webhook, start_trial, BillingAppState,
};

/// Routes for the business owner.
///
/// - `POST /billing/checkout` - open a payment intent
/// - `POST /billing/trial` - start a self-service trial
/// - `GET /billing/plan` - current plan
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/billing/checkout", post(create_checkout))
        .route("/billing/trial", post(start_trial))
        .route("/billing/plan", get(get_current_plan))
}

/// Operator routes. Every handler takes an `AdminUser`, so callers the
/// directory does not list as admins get 403.
///
/// - `POST /admin/trials` - grant a trial
/// - `GET /admin/webhooks/unprocessed` - list events left for reconciliation
/// - `POST /admin/webhooks/:request_id/replay` - reprocess one event
pub fn admin_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/admin/trials", post(grant_trial))
        .route("/admin/webhooks/unprocessed", get(list_unprocessed_webhooks))
        .route("/admin/webhooks/:request_id/replay", post(replay_webhook))
}

/// Processor callbacks. No user authentication; deliveries are signed.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/webhooks/:processor", post(receive_payment_notification))
}
