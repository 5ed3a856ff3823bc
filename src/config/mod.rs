//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `MARKETPLACE_BILLING`
//! prefix and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use marketplace_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod billing;
mod database;
mod error;
mod payment;
mod redis;
mod server;

pub use billing::BillingConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use redis::RedisConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// PostgreSQL connection
    pub database: DatabaseConfig,

    /// Cache invalidation backend; optional
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    /// Payment processor credentials
    #[serde(default)]
    pub payment: PaymentConfig,

    /// Billing periods, retention and catalog
    #[serde(default)]
    pub billing: BillingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `MARKETPLACE_BILLING__*` variables:
    ///
    /// - `MARKETPLACE_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `MARKETPLACE_BILLING__DATABASE__URL=...` -> `database.url = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or cannot be
    /// parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("MARKETPLACE_BILLING")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        if let Some(redis) = &self.redis {
            redis.validate()?;
        }
        self.payment.validate()?;
        self.billing.validate()?;
        // Checkout calls the gateway inside the request timeout.
        if self.server.request_timeout_secs <= self.payment.gateway_timeout_secs {
            return Err(ValidationError::RequestTimeoutBelowGateway);
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "MARKETPLACE_BILLING__DATABASE__URL",
        "MARKETPLACE_BILLING__PAYMENT__ACCESS_TOKEN",
        "MARKETPLACE_BILLING__PAYMENT__WEBHOOK_SECRET",
        "MARKETPLACE_BILLING__REDIS__URL",
        "MARKETPLACE_BILLING__SERVER__PORT",
        "MARKETPLACE_BILLING__SERVER__ENVIRONMENT",
        "MARKETPLACE_BILLING__BILLING__TRIAL_DAYS",
        "MARKETPLACE_BILLING__SERVER__REQUEST_TIMEOUT_SECS",
        "MARKETPLACE_BILLING__PAYMENT__GATEWAY_TIMEOUT_SECS",
    ];

    fn set_minimal_env() {
        env::set_var("MARKETPLACE_BILLING__DATABASE__URL", "postgres://test@localhost/billing");
        env::set_var("MARKETPLACE_BILLING__PAYMENT__ACCESS_TOKEN", "TEST-123");
        env::set_var("MARKETPLACE_BILLING__PAYMENT__WEBHOOK_SECRET", "shh");
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_from_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.database.url, "postgres://test@localhost/billing");
        assert_eq!(config.payment.access_token, "TEST-123");
        assert!(config.redis.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.billing.subscription_days, 30);
        assert_eq!(config.payment.processor, "mercadopago");
    }

    #[test]
    fn test_nested_overrides() {
        let config = load_with(&[
            ("MARKETPLACE_BILLING__SERVER__PORT", "3000"),
            ("MARKETPLACE_BILLING__BILLING__TRIAL_DAYS", "7"),
            ("MARKETPLACE_BILLING__REDIS__URL", "redis://localhost:6379"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.billing.trial_days, 7);
        assert_eq!(config.redis.map(|r| r.url).as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_production_requires_https_callback() {
        let config = load_with(&[("MARKETPLACE_BILLING__SERVER__ENVIRONMENT", "production")]).unwrap();
        assert!(config.is_production());
        assert_eq!(config.validate(), Err(ValidationError::PublicBaseUrlMustBeHttps));
    }

    #[test]
    fn test_request_timeout_must_outlast_gateway_timeout() {
        let config = load_with(&[
            ("MARKETPLACE_BILLING__SERVER__REQUEST_TIMEOUT_SECS", "10"),
            ("MARKETPLACE_BILLING__PAYMENT__GATEWAY_TIMEOUT_SECS", "10"),
        ])
        .unwrap();
        assert_eq!(config.validate(), Err(ValidationError::RequestTimeoutBelowGateway));

        let config = load_with(&[
            ("MARKETPLACE_BILLING__SERVER__REQUEST_TIMEOUT_SECS", "15"),
            ("MARKETPLACE_BILLING__PAYMENT__GATEWAY_TIMEOUT_SECS", "10"),
        ])
        .unwrap();
        assert!(config.validate().is_ok());
    }
}
