//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `PaymentRepository`, `CurrentPlanRepository`, `TrialRepository` - entity access
//! - `BillingUnitOfWork` - multi-entity writes committed in one transaction
//! - `WebhookEventRepository` - idempotency ledger for inbound notifications
//!
//! ## Collaborator Ports
//!
//! - `PaymentGateway` - external payment processor
//! - `PlanCatalog` - plan prices and limits
//! - `CacheInvalidator` - tag-based read cache invalidation
//! - `AuditLog` - append-only audit trail
//! - `BusinessDirectory` - user to business lookup

mod audit_log;
mod billing_unit_of_work;
mod business_directory;
mod cache_invalidator;
mod current_plan_repository;
mod payment_gateway;
mod payment_repository;
mod plan_catalog;
mod trial_repository;
mod webhook_event_repository;

pub use audit_log::{AuditAction, AuditEntityType, AuditEntry, AuditLog};
pub use billing_unit_of_work::{BillingUnitOfWork, PaymentTransition, TransitionOutcome, TrialOutcome};
pub use business_directory::BusinessDirectory;
pub use cache_invalidator::{business_tag, CacheInvalidator};
pub use current_plan_repository::CurrentPlanRepository;
pub use payment_gateway::{
    BackUrls, GatewayError, GatewayErrorCode, GatewayRecord, PaymentGateway, Preference,
    PreferenceItem, PreferenceRequest,
};
pub use payment_repository::PaymentRepository;
pub use plan_catalog::PlanCatalog;
pub use trial_repository::TrialRepository;
pub use webhook_event_repository::{SaveResult, WebhookEventRecord, WebhookEventRepository};
