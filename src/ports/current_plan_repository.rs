//! CurrentPlanRepository port - read access to each business's live plan.

use async_trait::async_trait;

use crate::domain::billing::CurrentPlan;
use crate::domain::foundation::{BusinessId, DomainError, Timestamp};

#[async_trait]
pub trait CurrentPlanRepository: Send + Sync {
    /// Returns the business's plan, or `None` if it has never had one.
    async fn find_by_business(
        &self,
        business_id: &BusinessId,
    ) -> Result<Option<CurrentPlan>, DomainError>;

    /// ACTIVE plans whose expiry is at or before `now`.
    async fn find_lapsed(&self, now: Timestamp, limit: u32) -> Result<Vec<CurrentPlan>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_plan_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn CurrentPlanRepository) {}
    }
}
