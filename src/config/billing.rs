//! Billing rules configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Length of a paid period, in days
    #[serde(default = "default_subscription_days")]
    pub subscription_days: i64,

    /// Length of a self-service trial, in days
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// How long processed webhook events are kept, in days
    #[serde(default = "default_webhook_retention_days")]
    pub webhook_retention_days: i64,

    /// ISO 4217 currency of the built-in plan catalog
    #[serde(default = "default_currency")]
    pub currency: String,

    /// YAML plan catalog; built-in defaults when unset
    pub plan_catalog_path: Option<String>,

    /// Interval of the expiry and retention sweeps, in seconds
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
}

impl BillingConfig {
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.subscription_days <= 0 {
            return Err(ValidationError::InvalidBillingPeriod("subscription_days"));
        }
        if self.trial_days <= 0 {
            return Err(ValidationError::InvalidBillingPeriod("trial_days"));
        }
        if self.webhook_retention_days <= 0 {
            return Err(ValidationError::InvalidBillingPeriod("webhook_retention_days"));
        }
        if self.maintenance_interval_secs == 0 {
            return Err(ValidationError::InvalidBillingPeriod("maintenance_interval_secs"));
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            subscription_days: default_subscription_days(),
            trial_days: default_trial_days(),
            webhook_retention_days: default_webhook_retention_days(),
            currency: default_currency(),
            plan_catalog_path: None,
            maintenance_interval_secs: default_maintenance_interval(),
        }
    }
}

fn default_subscription_days() -> i64 {
    30
}

fn default_trial_days() -> i64 {
    14
}

fn default_webhook_retention_days() -> i64 {
    90
}

fn default_currency() -> String {
    "ARS".to_string()
}

fn default_maintenance_interval() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BillingConfig::default();
        assert_eq!(config.subscription_days, 30);
        assert_eq!(config.trial_days, 14);
        assert_eq!(config.webhook_retention_days, 90);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_positive_periods_rejected() {
        let config = BillingConfig {
            trial_days: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidBillingPeriod("trial_days"))
        );
    }

    #[test]
    fn test_currency_must_be_iso_code() {
        for currency in ["ars", "PESO", ""] {
            let config = BillingConfig {
                currency: currency.to_string(),
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidCurrency));
        }
    }
}
