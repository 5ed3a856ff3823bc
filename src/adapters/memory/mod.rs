//! In-memory adapters for tests and local runs without infrastructure.

mod audit_log;
mod billing_store;
mod business_directory;
mod cache_invalidator;

pub use audit_log::InMemoryAuditLog;
pub use billing_store::InMemoryBillingStore;
pub use business_directory::InMemoryBusinessDirectory;
pub use cache_invalidator::{NoopCacheInvalidator, RecordingCacheInvalidator};
