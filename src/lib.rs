//! Marketplace Billing - payment and subscription reconciliation engine.
//!
//! Receives asynchronous payment notifications from an external processor,
//! reconciles them against the processor's authoritative record and applies
//! the outcome to a business's payment and subscription plan exactly once.
//! Also issues payment intents, manages trials and runs the plan expiry and
//! ledger retention sweeps.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
