//! PurgeWebhookEventsHandler - ledger retention.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::Timestamp;
use crate::ports::WebhookEventRepository;

/// Deletes processed ledger rows older than the retention window.
///
/// Unprocessed rows are kept regardless of age; they are waiting for an operator.
pub struct PurgeWebhookEventsHandler {
    repository: Arc<dyn WebhookEventRepository>,
    retention_days: i64,
}

impl PurgeWebhookEventsHandler {
    pub fn new(repository: Arc<dyn WebhookEventRepository>, retention_days: i64) -> Self {
        Self {
            repository,
            retention_days,
        }
    }

    pub async fn handle(&self, now: Timestamp) -> Result<u64, BillingError> {
        let cutoff = now.minus_days(self.retention_days);
        let deleted = self.repository.delete_processed_before(cutoff).await?;
        if deleted > 0 {
            tracing::info!(deleted, retention_days = self.retention_days, "Purged processed webhook events");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::ports::WebhookEventRecord;

    #[tokio::test]
    async fn purges_only_old_processed_rows() {
        let store = InMemoryBillingStore::new();
        for id in ["old-done", "old-open"] {
            let row = WebhookEventRecord::received(id, id, "mercadopago", "payment", None, serde_json::json!({}));
            WebhookEventRepository::insert(&store, row).await.unwrap();
        }
        store.mark_processed("old-done", Timestamp::now()).await.unwrap();

        let handler = PurgeWebhookEventsHandler::new(Arc::new(store.clone()), 90);

        // Nothing is old enough yet.
        assert_eq!(handler.handle(Timestamp::now()).await.unwrap(), 0);

        let later = Timestamp::now().add_days(91);
        assert_eq!(handler.handle(later).await.unwrap(), 1);
        assert!(store.webhook_event("old-open").is_some());
        assert!(store.webhook_event("old-done").is_none());
    }
}
