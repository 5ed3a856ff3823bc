//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing core to external systems:
//! - `postgres` - persistence, unit of work, audit log, business directory
//! - `cache` - Redis tag invalidation
//! - `mercadopago` - payment gateway client and its test double
//! - `catalog` - plan catalog
//! - `memory` - in-memory stores for tests and local runs
//! - `http` - axum routes

pub mod cache;
pub mod catalog;
pub mod http;
pub mod memory;
pub mod mercadopago;
pub mod postgres;
