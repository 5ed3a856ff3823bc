//! In-memory audit log.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{AuditEntry, AuditLog};

#[derive(Clone, Default)]
pub struct InMemoryAuditLog {
    inner: Arc<Mutex<AuditState>>,
}

#[derive(Default)]
struct AuditState {
    entries: Vec<AuditEntry>,
    fail: bool,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// An audit log whose appends always fail.
    pub fn failing() -> Self {
        let log = Self::new();
        log.state().fail = true;
        log
    }

    fn state(&self) -> MutexGuard<'_, AuditState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.state().entries.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.fail {
            return Err(DomainError::new(ErrorCode::DatabaseError, "audit log unavailable"));
        }
        state.entries.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{AuditAction, AuditEntityType};

    #[tokio::test]
    async fn appends_entries() {
        let log = InMemoryAuditLog::new();
        log.append(AuditEntry::new(AuditEntityType::Trial, "t-1", AuditAction::Create, None))
            .await
            .unwrap();
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].entity_id, "t-1");
    }
}
