//! Mercado Pago payment gateway adapter.
//!
//! Implements `PaymentGateway` over the REST API with bearer-token auth.
//! Every call is bounded by the configured timeout so a slow processor
//! degrades to "cannot reconcile yet" instead of holding the webhook request.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{GatewayError, GatewayErrorCode, GatewayRecord, PaymentGateway, Preference, PreferenceRequest};

use super::api_types::{MpPayment, MpPreference, MpPreferenceBody};

/// Mercado Pago API configuration.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    access_token: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl MercadoPagoConfig {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            access_token,
            api_base_url: "https://api.mercadopago.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct MercadoPagoGateway {
    config: MercadoPagoConfig,
    http_client: reqwest::Client,
}

impl MercadoPagoGateway {
    pub fn new(config: MercadoPagoConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::new(GatewayErrorCode::ProviderError, e.to_string()))?;
        Ok(Self { config, http_client })
    }

    fn preferences_url(&self) -> String {
        format!("{}/checkout/preferences", self.config.api_base_url)
    }

    fn payment_url(&self, external_payment_id: &str) -> String {
        format!("{}/v1/payments/{}", self.config.api_base_url, external_payment_id)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::timeout(err.to_string())
    } else {
        GatewayError::network(err.to_string())
    }
}

/// Maps a non-success HTTP status to a gateway error.
fn status_error(status: reqwest::StatusCode, body: &str, resource: &str) -> GatewayError {
    let err = match status.as_u16() {
        401 | 403 => GatewayError::authentication(format!("Mercado Pago rejected credentials: {}", body)),
        404 => GatewayError::not_found(resource),
        429 => GatewayError::new(GatewayErrorCode::RateLimitExceeded, "Mercado Pago rate limit"),
        500..=599 => GatewayError::new(GatewayErrorCode::NetworkError, format!("Mercado Pago unavailable: {}", body)),
        _ => GatewayError::provider(format!("Mercado Pago API error: {}", body)),
    };
    err.with_http_status(status.as_u16())
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference, GatewayError> {
        let body = MpPreferenceBody::from_request(&request);

        let response = self
            .http_client
            .post(self.preferences_url())
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                external_reference = %request.external_reference,
                error = %error_text,
                "Mercado Pago create_preference failed"
            );
            return Err(status_error(status, &error_text, "Preference"));
        }

        let preference: MpPreference = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse preference: {}", e))
        })?;

        Ok(preference.into())
    }

    async fn get_payment(&self, external_payment_id: &str) -> Result<GatewayRecord, GatewayError> {
        let response = self
            .http_client
            .get(self.payment_url(external_payment_id))
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                external_payment_id,
                "Mercado Pago payment lookup failed"
            );
            return Err(status_error(
                status,
                &error_text,
                &format!("Payment {}", external_payment_id),
            ));
        }

        let payment: MpPayment = response.json().await.map_err(|e| {
            GatewayError::invalid_response(format!("Failed to parse payment: {}", e))
        })?;

        Ok(payment.into())
    }
}
