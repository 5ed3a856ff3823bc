//! Mock payment gateway for testing.
//!
//! Supports:
//! - Pre-configured payment records by external id
//! - Error injection, once or for every lookup
//! - Lookup latency
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{GatewayError, GatewayRecord, PaymentGateway, Preference, PreferenceRequest};

#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    payments: HashMap<String, GatewayRecord>,
    preferences: Vec<PreferenceRequest>,
    next_error: Option<GatewayError>,
    lookup_error: Option<GatewayError>,
    lookup_delay: Option<Duration>,
    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Registers the record returned by `get_payment` for `record.id`.
    pub fn set_payment(&self, record: GatewayRecord) {
        self.state().payments.insert(record.id.clone(), record);
    }

    /// Fails the next call, whichever method it is.
    pub fn set_error(&self, error: GatewayError) {
        self.state().next_error = Some(error);
    }

    /// Fails every `get_payment` until cleared.
    pub fn fail_lookups(&self, error: GatewayError) {
        self.state().lookup_error = Some(error);
    }

    pub fn clear_lookup_failure(&self) {
        self.state().lookup_error = None;
    }

    /// Delays every `get_payment` by `delay`.
    pub fn delay_lookups(&self, delay: Duration) {
        self.state().lookup_delay = Some(delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn preferences(&self) -> Vec<PreferenceRequest> {
        self.state().preferences.clone()
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference, GatewayError> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: "create_preference".to_string(),
            args: vec![request.external_reference.clone()],
        });
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }

        let id = format!("pref_{}", state.preferences.len() + 1);
        state.preferences.push(request);
        Ok(Preference {
            init_point: format!("https://checkout.example.com/{}", id),
            sandbox_init_point: Some(format!("https://sandbox.checkout.example.com/{}", id)),
            id,
        })
    }

    async fn get_payment(&self, external_payment_id: &str) -> Result<GatewayRecord, GatewayError> {
        let delay = self.state().lookup_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: "get_payment".to_string(),
            args: vec![external_payment_id.to_string()],
        });
        if let Some(err) = state.next_error.take() {
            return Err(err);
        }
        if let Some(err) = &state.lookup_error {
            return Err(err.clone());
        }

        state
            .payments
            .get(external_payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(&format!("Payment {}", external_payment_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{BackUrls, GatewayErrorCode};
    use std::collections::BTreeMap;

    fn request() -> PreferenceRequest {
        PreferenceRequest {
            items: vec![],
            metadata: BTreeMap::new(),
            back_urls: BackUrls::default(),
            external_reference: "p-1".to_string(),
            notification_url: "https://api/webhooks/mercadopago".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_configured_payment() {
        let gateway = MockPaymentGateway::new();
        gateway.set_payment(GatewayRecord {
            id: "123".to_string(),
            status: Some("approved".to_string()),
            ..Default::default()
        });

        let record = gateway.get_payment("123").await.unwrap();
        assert_eq!(record.status.as_deref(), Some("approved"));
        assert_eq!(gateway.call_count("get_payment"), 1);
    }

    #[tokio::test]
    async fn unknown_payment_is_not_found() {
        let gateway = MockPaymentGateway::new();
        let err = gateway.get_payment("nope").await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::NotFound);
    }

    #[tokio::test]
    async fn injected_error_fires_once() {
        let gateway = MockPaymentGateway::new();
        gateway.set_error(GatewayError::timeout("slow"));

        assert!(gateway.create_preference(request()).await.is_err());
        assert!(gateway.create_preference(request()).await.is_ok());
        assert_eq!(gateway.preferences().len(), 1);
    }

    #[tokio::test]
    async fn persistent_lookup_failure_until_cleared() {
        let gateway = MockPaymentGateway::new();
        gateway.set_payment(GatewayRecord { id: "1".into(), ..Default::default() });
        gateway.fail_lookups(GatewayError::network("down"));

        assert!(gateway.get_payment("1").await.is_err());
        assert!(gateway.get_payment("1").await.is_err());
        gateway.clear_lookup_failure();
        assert!(gateway.get_payment("1").await.is_ok());
    }

    #[tokio::test]
    async fn delayed_lookup_still_answers() {
        let gateway = MockPaymentGateway::new();
        gateway.set_payment(GatewayRecord { id: "1".into(), ..Default::default() });
        gateway.delay_lookups(Duration::from_millis(20));

        let started = std::time::Instant::now();
        assert!(gateway.get_payment("1").await.is_ok());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
