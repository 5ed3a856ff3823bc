//! Billing domain.
//!
//! Plans, payments, the per-business current plan and trials, plus the pure
//! pieces of webhook handling: signature verification, status normalization
//! and notification parsing.

mod current_plan;
mod errors;
mod normalized_status;
mod notification;
mod payment;
mod plan;
pub mod signature;
mod trial;

pub use current_plan::{CurrentPlan, PlanActivation, PlanStatus};
pub use errors::BillingError;
pub use normalized_status::{normalize, NormalizedStatus};
pub use notification::PaymentNotification;
pub use payment::{Payment, PaymentStatus, Settlement};
pub use plan::{Plan, PlanLimits, PlanType};
pub use signature::SignatureVerifier;
pub use trial::Trial;
