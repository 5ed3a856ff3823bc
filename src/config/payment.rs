//! Payment processor configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment processor configuration (Mercado Pago)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Processor name, also the webhook path segment
    #[serde(default = "default_processor")]
    pub processor: String,

    /// API access token
    #[serde(default)]
    pub access_token: String,

    /// Shared secret used to sign notifications
    #[serde(default)]
    pub webhook_secret: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for calls to the processor API, in seconds
    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Where the hosted checkout sends the buyer afterwards
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
    pub pending_url: Option<String>,
}

impl PaymentConfig {
    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// True for test credentials.
    pub fn is_test_mode(&self) -> bool {
        self.access_token.starts_with("TEST-")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_token.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT_ACCESS_TOKEN"));
        }
        if self.webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT_WEBHOOK_SECRET"));
        }
        if !self.access_token.starts_with("APP_USR-") && !self.access_token.starts_with("TEST-") {
            return Err(ValidationError::InvalidAccessToken);
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidApiBaseUrl);
        }
        if self.gateway_timeout_secs == 0 || self.gateway_timeout_secs > 60 {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            processor: default_processor(),
            access_token: String::new(),
            webhook_secret: String::new(),
            api_base_url: default_api_base_url(),
            gateway_timeout_secs: default_gateway_timeout(),
            success_url: None,
            failure_url: None,
            pending_url: None,
        }
    }
}

fn default_processor() -> String {
    "mercadopago".to_string()
}

fn default_api_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_gateway_timeout() -> u64 {
    10
}
