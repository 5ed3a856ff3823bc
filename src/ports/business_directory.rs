//! BusinessDirectory port - resolves the business a user owns and whether
//! the user operates the platform.
//!
//! Authentication itself lives outside this service.

use async_trait::async_trait;

use crate::domain::foundation::{BusinessId, DomainError, UserId};

#[async_trait]
pub trait BusinessDirectory: Send + Sync {
    /// Returns the user's business, if any.
    async fn business_for_user(&self, user_id: &UserId) -> Result<Option<BusinessId>, DomainError>;

    /// True when the user may use the operator endpoints.
    async fn is_admin(&self, user_id: &UserId) -> Result<bool, DomainError>;
}
