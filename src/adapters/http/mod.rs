//! HTTP adapters - REST API implementations.

pub mod billing;

use std::time::Duration;

use axum::http::HeaderName;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use billing::{BillingAppState, BillingPorts, BillingSettings};

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the full application router.
///
/// Webhook routes are mounted outside the request-id layers: the processor's
/// `x-request-id` is the idempotency key, and a generated one must never
/// replace a missing header. They also sit outside the timeout layer, whose
/// 408 would make the processor retry; the gateway client's own timeout
/// bounds them.
pub fn app_router(state: BillingAppState, request_timeout: Duration) -> Router {
    let request_id = HeaderName::from_static(billing::REQUEST_ID_HEADER);

    let api = billing::billing_routes()
        .merge(billing::admin_routes())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .merge(billing::webhook_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
