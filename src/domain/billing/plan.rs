//! Subscription plan reference data.
//!
//! Plans are owned by the product catalog; this module only describes their
//! shape. Prices are in minor currency units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Subscription tier a business can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanType {
    /// Default tier, never paid for.
    Free,
    Basic,
    Premium,
}

impl PlanType {
    /// Returns true if upgrading to this tier requires a payment.
    pub fn is_paid(&self) -> bool {
        !matches!(self, PlanType::Free)
    }

    /// Canonical storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "FREE",
            PlanType::Basic => "BASIC",
            PlanType::Premium => "PREMIUM",
        }
    }

    /// Human readable name used on checkout line items.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlanType::Free => "Free",
            PlanType::Basic => "Basic",
            PlanType::Premium => "Premium",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(PlanType::Free),
            "BASIC" => Ok(PlanType::Basic),
            "PREMIUM" => Ok(PlanType::Premium),
            other => Err(ValidationError::invalid_format(
                "plan_type",
                format!("unknown plan '{}'", other),
            )),
        }
    }
}

/// Feature limits granted by a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_products: u32,
    pub max_images: u32,
}

/// A plan as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(rename = "type")]
    pub plan_type: PlanType,
    /// Price in minor units (cents).
    pub price_cents: i64,
    pub currency: String,
    pub limits: PlanLimits,
}

impl Plan {
    /// Price expressed in major units, as payment processors expect it.
    pub fn unit_price(&self) -> f64 {
        self.price_cents as f64 / 100.0
    }
}
