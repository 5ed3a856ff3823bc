//! PostgreSQL adapters - Database implementations for the billing ports.
//!
//! - `PostgresPaymentRepository` - payments
//! - `PostgresSubscriptionRepository` - current plans and trials
//! - `PostgresWebhookEventRepository` - idempotency ledger
//! - `PostgresBillingUnitOfWork` - multi-row transactions
//! - `PostgresAuditLog` - audit trail
//! - `PostgresBusinessDirectory` - user to business lookup

mod audit_log;
mod billing_unit_of_work;
mod business_directory;
mod payment_repository;
mod subscription_repository;
mod webhook_event_repository;

pub use audit_log::PostgresAuditLog;
pub use billing_unit_of_work::PostgresBillingUnitOfWork;
pub use business_directory::PostgresBusinessDirectory;
pub use payment_repository::PostgresPaymentRepository;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_repository::PostgresWebhookEventRepository;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Wraps a sqlx error as a database failure with context.
fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

/// Wraps an unreadable column value as a database failure.
fn corrupt_column(column: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, e),
    )
}
