//! TrialRepository port.

use async_trait::async_trait;

use crate::domain::billing::Trial;
use crate::domain::foundation::{BusinessId, DomainError};

#[async_trait]
pub trait TrialRepository: Send + Sync {
    async fn find_by_business(&self, business_id: &BusinessId) -> Result<Option<Trial>, DomainError>;
}
