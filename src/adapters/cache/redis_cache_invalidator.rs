//! Redis-backed cache invalidation by tag.
//!
//! Readers that cache a business's plan register the cache key in a Redis set
//! named after the tag (`cache-tag:business:<id>`). Invalidating a tag deletes
//! every key in the set and then the set itself.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::CacheInvalidator;

const TAG_PREFIX: &str = "cache-tag:";

/// Redis key of the set holding the cache keys for `tag`.
pub fn tag_set_key(tag: &str) -> String {
    format!("{}{}", TAG_PREFIX, tag)
}

#[derive(Clone)]
pub struct RedisCacheInvalidator {
    conn: MultiplexedConnection,
}

impl RedisCacheInvalidator {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

fn cache_error(e: redis::RedisError) -> DomainError {
    DomainError::new(ErrorCode::CacheError, format!("Redis error: {}", e))
}

#[async_trait]
impl CacheInvalidator for RedisCacheInvalidator {
    async fn invalidate_tags(&self, tags: &[String]) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();

        for tag in tags {
            let set_key = tag_set_key(tag);
            let keys: Vec<String> = conn.smembers(&set_key).await.map_err(cache_error)?;
            if !keys.is_empty() {
                conn.del::<_, ()>(&keys).await.map_err(cache_error)?;
            }
            conn.del::<_, ()>(&set_key).await.map_err(cache_error)?;
            tracing::debug!(tag = %tag, keys = keys.len(), "Cache tag invalidated");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::BusinessId;
    use crate::ports::business_tag;

    #[test]
    fn tag_set_key_is_prefixed() {
        let id = BusinessId::new();
        assert_eq!(
            tag_set_key(&business_tag(&id)),
            format!("cache-tag:business:{}", id)
        );
    }
}
