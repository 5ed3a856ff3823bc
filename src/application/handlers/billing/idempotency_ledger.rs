//! Idempotency ledger for inbound notifications.
//!
//! Gives at-most-once effect under at-least-once delivery: the first delivery
//! inserts a ledger row, every later one (including concurrent ones) hits the
//! store's uniqueness constraint and is reported as already seen.

use std::sync::Arc;

use serde_json::{Map, Value};
use sha1::{Digest, Sha1};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

/// Command to record a notification delivery.
#[derive(Debug, Clone)]
pub struct RecordAttemptCommand {
    /// Processor tag (e.g. "mercadopago").
    pub source: String,
    /// `x-request-id`, if the delivery carried one.
    pub request_id: Option<String>,
    pub event_type: String,
    pub external_id: Option<String>,
    pub payload: Value,
}

/// Result of recording a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerAttempt {
    /// Request id the row is stored under; used to mark it processed.
    pub request_id: String,
    pub already_seen: bool,
}

/// A request id derived from the payload when the processor sent none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedRequestId {
    /// `<source>-<unix_ts>-<hash>`.
    pub request_id: String,
    /// `<source>:<hash>`; identical for byte-identical payloads.
    pub dedupe_key: String,
}

/// Derives a request id from the canonical JSON of `payload`.
///
/// The hash is the first 8 hex characters of SHA-1 over the payload with
/// object keys sorted, so retried deliveries of the same payload share a
/// dedupe key while distinct payloads do not.
pub fn derive_request_id(source: &str, payload: &Value, now: Timestamp) -> DerivedRequestId {
    let canonical = canonical_json(payload);
    let digest = hex::encode(Sha1::digest(canonical.as_bytes()));
    let hash = &digest[..8];

    DerivedRequestId {
        request_id: format!("{}-{}-{}", source, now.as_unix_secs(), hash),
        dedupe_key: format!("{}:{}", source, hash),
    }
}

/// Serializes `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    sort_keys(value).to_string()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

pub struct IdempotencyLedger {
    repository: Arc<dyn WebhookEventRepository>,
}

impl IdempotencyLedger {
    pub fn new(repository: Arc<dyn WebhookEventRepository>) -> Self {
        Self { repository }
    }

    /// Records a delivery.
    ///
    /// A uniqueness violation is not an error: it is returned as
    /// `already_seen = true`. Any other store failure is propagated.
    pub async fn record_attempt(&self, cmd: RecordAttemptCommand) -> Result<LedgerAttempt, DomainError> {
        let supplied = cmd
            .request_id
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        let (request_id, dedupe_key) = match supplied {
            Some(request_id) => (request_id.clone(), request_id),
            None => {
                let derived = derive_request_id(&cmd.source, &cmd.payload, Timestamp::now());
                (derived.request_id, derived.dedupe_key)
            }
        };

        let record = WebhookEventRecord::received(
            request_id.clone(),
            dedupe_key,
            cmd.source,
            cmd.event_type,
            cmd.external_id,
            cmd.payload,
        );

        let already_seen = match self.repository.insert(record).await? {
            SaveResult::Inserted => false,
            SaveResult::AlreadyExists => true,
        };

        Ok(LedgerAttempt {
            request_id,
            already_seen,
        })
    }

    /// Marks a row processed. Safe to call repeatedly.
    pub async fn mark_processed(&self, request_id: &str) -> Result<(), DomainError> {
        self.repository.mark_processed(request_id, Timestamp::now()).await
    }
}
