//! ReplayWebhookEventHandler - operator-triggered reprocessing.
//!
//! Events left unprocessed (gateway down, payment not yet resolvable, failed
//! commit) are never retried automatically. An operator lists them and replays
//! one at a time.

use std::sync::Arc;

use serde_json::json;

use crate::domain::billing::{BillingError, PaymentNotification};
use crate::domain::foundation::UserId;
use crate::ports::{AuditAction, AuditEntityType, AuditEntry, AuditLog, WebhookEventRecord, WebhookEventRepository};

use super::process_payment_notification::{NotificationOutcome, PaymentNotificationProcessor};

#[derive(Debug, Clone)]
pub struct ReplayWebhookEventCommand {
    pub request_id: String,
    pub actor: Option<UserId>,
}

pub struct ReplayWebhookEventHandler {
    repository: Arc<dyn WebhookEventRepository>,
    processor: Arc<PaymentNotificationProcessor>,
    audit_log: Arc<dyn AuditLog>,
}

impl ReplayWebhookEventHandler {
    pub fn new(
        repository: Arc<dyn WebhookEventRepository>,
        processor: Arc<PaymentNotificationProcessor>,
        audit_log: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            repository,
            processor,
            audit_log,
        }
    }

    pub async fn handle(&self, cmd: ReplayWebhookEventCommand) -> Result<NotificationOutcome, BillingError> {
        let record = self
            .repository
            .find_by_request_id(&cmd.request_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Webhook event", &cmd.request_id))?;

        if record.processed {
            return Err(BillingError::Conflict(format!(
                "webhook event {} is already processed",
                cmd.request_id
            )));
        }

        let notification = PaymentNotification::from_value(record.raw_payload.clone())?;
        let outcome = self.processor.process(&record.request_id, &notification).await;

        tracing::info!(
            request_id = %record.request_id,
            outcome = outcome.as_str(),
            "Webhook event replayed"
        );

        let entry = AuditEntry::new(
            AuditEntityType::WebhookEvent,
            record.request_id.clone(),
            AuditAction::Replay,
            cmd.actor,
        )
        .with_details(json!({ "outcome": outcome.as_str() }));
        if let Err(e) = self.audit_log.append(entry).await {
            tracing::warn!(request_id = %record.request_id, error = %e, "Audit log append failed");
        }

        Ok(outcome)
    }
}

/// Lists ledger rows still waiting for an operator, oldest first.
pub struct ListUnprocessedWebhookEventsHandler {
    repository: Arc<dyn WebhookEventRepository>,
}

impl ListUnprocessedWebhookEventsHandler {
    pub const MAX_LIMIT: u32 = 500;

    pub fn new(repository: Arc<dyn WebhookEventRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, limit: u32) -> Result<Vec<WebhookEventRecord>, BillingError> {
        let limit = limit.clamp(1, Self::MAX_LIMIT);
        Ok(self.repository.list_unprocessed(limit).await?)
    }
}
