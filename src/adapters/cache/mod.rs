//! Cache adapters.

mod redis_cache_invalidator;

pub use redis_cache_invalidator::{tag_set_key, RedisCacheInvalidator};
