//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `billing` - Plans, payments, current plans, trials and webhook verification

pub mod billing;
pub mod foundation;
