//! WebhookEventRepository port - the idempotency ledger.
//!
//! Every inbound notification is recorded before it has any effect. The
//! processor delivers at least once, possibly concurrently and out of order,
//! so deduplication relies on a uniqueness constraint in the store rather than
//! on in-process locking: several server processes may receive the same
//! notification.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{DomainError, Timestamp};

/// One row of the idempotency ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEventRecord {
    /// Delivery id, either sent by the processor or derived from the payload.
    pub request_id: String,

    /// Uniqueness key: the request id when supplied, `<source>:<hash>` when derived.
    pub dedupe_key: String,

    /// Processor the notification came from (e.g. "mercadopago").
    pub source: String,

    /// `type` / `topic` of the notification.
    pub event_type: String,

    /// External payment id carried in `data.id`.
    pub external_id: Option<String>,

    /// Original payload, kept for replay and auditing.
    pub raw_payload: serde_json::Value,

    pub processed: bool,
    pub processed_at: Option<Timestamp>,
    pub received_at: Timestamp,
}

impl WebhookEventRecord {
    /// Creates an unprocessed record.
    pub fn received(
        request_id: impl Into<String>,
        dedupe_key: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
        external_id: Option<String>,
        raw_payload: serde_json::Value,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            dedupe_key: dedupe_key.into(),
            source: source.into(),
            event_type: event_type.into(),
            external_id,
            raw_payload,
            processed: false,
            processed_at: None,
            received_at: Timestamp::now(),
        }
    }
}

/// Result of attempting to insert a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time this notification has been seen.
    Inserted,
    /// Another delivery already inserted it.
    AlreadyExists,
}

/// Port for the idempotency ledger.
///
/// Implementations must enforce uniqueness on both `request_id` and
/// `dedupe_key` and report a violation as `SaveResult::AlreadyExists`.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Inserts a new record, or reports that it already exists.
    async fn insert(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Marks a record processed. Calling it again is a no-op.
    async fn mark_processed(&self, request_id: &str, at: Timestamp) -> Result<(), DomainError>;

    async fn find_by_request_id(
        &self,
        request_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Oldest unprocessed records first.
    async fn list_unprocessed(&self, limit: u32) -> Result<Vec<WebhookEventRecord>, DomainError>;

    /// Deletes processed records received before `before`. Unprocessed rows are kept.
    ///
    /// Returns the number of records deleted.
    async fn delete_processed_before(&self, before: Timestamp) -> Result<u64, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_event_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn WebhookEventRepository) {}
    }

    #[test]
    fn received_record_is_unprocessed() {
        let record = WebhookEventRecord::received(
            "req-1",
            "req-1",
            "mercadopago",
            "payment",
            Some("123".to_string()),
            serde_json::json!({"type": "payment"}),
        );

        assert!(!record.processed);
        assert!(record.processed_at.is_none());
        assert_eq!(record.dedupe_key, "req-1");
        assert_eq!(record.external_id.as_deref(), Some("123"));
    }

    #[test]
    fn save_result_variants_differ() {
        assert_ne!(SaveResult::Inserted, SaveResult::AlreadyExists);
    }
}
