//! HTTP adapter for billing endpoints.
//!
//! - `POST /webhooks/:processor` - payment notifications (always 200)
//! - `POST /billing/checkout`, `POST /billing/trial`, `GET /billing/plan`
//! - `POST /admin/trials`, `GET /admin/webhooks/unprocessed`,
//!   `POST /admin/webhooks/:request_id/replay`

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{
    AdminRejection, AdminUser, AuthenticatedUser, BillingApiError, BillingAppState, BillingPorts,
    BillingSettings, REQUEST_ID_HEADER, SIGNATURE_HEADER,
};
pub use routes::{admin_routes, billing_routes, webhook_routes};
