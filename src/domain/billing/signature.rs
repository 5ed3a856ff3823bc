//! Webhook signature verification.
//!
//! The processor signs a short manifest rather than the body:
//!
//! ```text
//! id:<data.id lowercased>;request-id:<x-request-id>;ts:<ts>;
//! ```
//!
//! with HMAC-SHA256 over the shared secret, sent as
//! `x-signature: ts=<unix-seconds>,v1=<hex-hmac>`. The `request-id` segment is
//! omitted when the delivery carries no request id.
//!
//! Verification never fails loudly: every malformed input yields `false`.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Timestamp exactly as sent; it is signed verbatim.
    pub ts: String,
    /// Hex-encoded HMAC.
    pub v1: String,
}

impl SignatureHeader {
    /// Parses `ts=...,v1=...` in any order, tolerating whitespace around parts.
    ///
    /// Unknown fields are ignored. Returns `None` if `ts` or `v1` is missing or empty.
    pub fn parse(header: &str) -> Option<Self> {
        let mut ts = None;
        let mut v1 = None;

        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "ts" => ts = Some(value.trim().to_string()),
                "v1" => v1 = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (ts, v1) {
            (Some(ts), Some(v1)) if !ts.is_empty() && !v1.is_empty() => Some(Self { ts, v1 }),
            _ => None,
        }
    }
}

/// Builds the canonical manifest that the processor signs.
pub fn build_manifest(external_id: &str, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = format!("id:{};", external_id.to_lowercase());
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}

/// Computes the hex HMAC-SHA256 of the manifest for the given inputs.
///
/// Used by the verifier, and by callers that need to produce signed deliveries
/// (sandbox tooling, tests).
pub fn compute_signature(secret: &str, external_id: &str, request_id: Option<&str>, ts: &str) -> String {
    let manifest = build_manifest(external_id, request_id, ts);
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(manifest.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a notification signature.
///
/// Returns `false` if the header, secret or external id is empty, if `ts` or
/// `v1` is missing, or if `v1` does not match the manifest HMAC.
pub fn verify(signature_header: &str, secret: &str, external_id: &str, request_id: &str) -> bool {
    if signature_header.trim().is_empty() || secret.is_empty() || external_id.trim().is_empty() {
        return false;
    }
    let Some(header) = SignatureHeader::parse(signature_header) else {
        return false;
    };

    let expected = compute_signature(secret, external_id.trim(), Some(request_id.trim()), &header.ts);
    constant_time_compare(expected.as_bytes(), header.v1.as_bytes())
}

/// Performs constant-time comparison of two byte slices.
///
/// Unequal lengths return immediately; only equal-length inputs are compared.
fn constant_time_compare(expected: &[u8], provided: &[u8]) -> bool {
    if expected.is_empty() || expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}

/// Verifier bound to the configured webhook secret.
pub struct SignatureVerifier {
    secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    pub fn verify(&self, signature_header: &str, external_id: &str, request_id: &str) -> bool {
        verify(
            signature_header,
            self.secret.expose_secret(),
            external_id,
            request_id,
        )
    }
}
