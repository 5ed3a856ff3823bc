//! CacheInvalidator port - tag-based invalidation of read-through caches.
//!
//! Consumed fire-and-forget: a failed invalidation is logged and the entry
//! heals on its TTL.

use async_trait::async_trait;

use crate::domain::foundation::{BusinessId, DomainError};

/// Tag carried by every cache entry derived from a business's data.
pub fn business_tag(business_id: &BusinessId) -> String {
    format!("business:{}", business_id)
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Drops every entry tagged with any of `tags`.
    async fn invalidate_tags(&self, tags: &[String]) -> Result<(), DomainError>;
}
