//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers hold their dependencies as `Arc<dyn Port>` and are wired once at
//! startup.

pub mod handlers;

pub use handlers::billing::{
    HandlePaymentNotificationCommand, HandlePaymentNotificationHandler, NotificationOutcome,
};
