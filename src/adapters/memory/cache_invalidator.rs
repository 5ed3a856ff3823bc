//! Cache invalidators that do not need Redis.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::CacheInvalidator;

/// Invalidator used when no cache is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCacheInvalidator;

#[async_trait]
impl CacheInvalidator for NoopCacheInvalidator {
    async fn invalidate_tags(&self, _tags: &[String]) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Records every invalidation for assertions. Can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingCacheInvalidator {
    inner: Arc<Mutex<RecordingState>>,
}

#[derive(Default)]
struct RecordingState {
    invalidated: Vec<String>,
    fail: bool,
}

impl RecordingCacheInvalidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with a cache error from now on.
    pub fn failing() -> Self {
        let invalidator = Self::new();
        invalidator.state().fail = true;
        invalidator
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tags invalidated so far, in call order.
    pub fn invalidated_tags(&self) -> Vec<String> {
        self.state().invalidated.clone()
    }
}

#[async_trait]
impl CacheInvalidator for RecordingCacheInvalidator {
    async fn invalidate_tags(&self, tags: &[String]) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.fail {
            return Err(DomainError::new(
                ErrorCode::CacheError,
                "cache unavailable",
            ));
        }
        state.invalidated.extend(tags.iter().cloned());
        Ok(())
    }
}
