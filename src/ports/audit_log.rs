//! AuditLog port - append-only record of administrative mutations.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// Audited entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEntityType {
    Trial,
    Payment,
    Plan,
    WebhookEvent,
}

impl AuditEntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEntityType::Trial => "TRIAL",
            AuditEntityType::Payment => "PAYMENT",
            AuditEntityType::Plan => "PLAN",
            AuditEntityType::WebhookEvent => "WEBHOOK_EVENT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Replay,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Replay => "REPLAY",
            AuditAction::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub entity_type: AuditEntityType,
    pub entity_id: String,
    pub action: AuditAction,
    /// `None` for system-initiated changes.
    pub actor: Option<UserId>,
    pub details: serde_json::Value,
    pub occurred_at: Timestamp,
}

impl AuditEntry {
    pub fn new(
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
        action: AuditAction,
        actor: Option<UserId>,
    ) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
            action,
            actor,
            details: serde_json::Value::Null,
            occurred_at: Timestamp::now(),
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_log_is_object_safe() {
        fn _accepts_dyn(_log: &dyn AuditLog) {}
    }

    #[test]
    fn entry_serializes_upper_case_kinds() {
        let entry = AuditEntry::new(AuditEntityType::Trial, "t-1", AuditAction::Create, None);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["entity_type"], "TRIAL");
        assert_eq!(json["action"], "CREATE");
    }
}
