//! GetCurrentPlanHandler - query for a business's live plan.

use std::sync::Arc;

use crate::domain::billing::{BillingError, CurrentPlan};
use crate::domain::foundation::{BusinessId, Timestamp};
use crate::ports::CurrentPlanRepository;

#[derive(Debug, Clone)]
pub struct GetCurrentPlanQuery {
    pub business_id: BusinessId,
}

pub struct GetCurrentPlanHandler {
    plans: Arc<dyn CurrentPlanRepository>,
}

impl GetCurrentPlanHandler {
    pub fn new(plans: Arc<dyn CurrentPlanRepository>) -> Self {
        Self { plans }
    }

    /// Returns the stored plan, or the INACTIVE default for a business without one.
    ///
    /// A plan whose expiry has passed is reported as expired even before the
    /// sweep has stored it.
    pub async fn handle(&self, query: GetCurrentPlanQuery) -> Result<CurrentPlan, BillingError> {
        let now = Timestamp::now();
        let mut plan = self
            .plans
            .find_by_business(&query.business_id)
            .await?
            .unwrap_or_else(|| CurrentPlan::inactive(query.business_id, now));
        plan.expire_if_lapsed(now);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::domain::billing::{PlanStatus, PlanType};

    #[tokio::test]
    async fn business_without_plan_is_inactive_free() {
        let handler = GetCurrentPlanHandler::new(Arc::new(InMemoryBillingStore::new()));
        let plan = handler
            .handle(GetCurrentPlanQuery { business_id: BusinessId::new() })
            .await
            .unwrap();

        assert_eq!(plan.plan_type, PlanType::Free);
        assert_eq!(plan.plan_status, PlanStatus::Inactive);
    }

    #[tokio::test]
    async fn lapsed_plan_reads_as_expired() {
        let store = InMemoryBillingStore::new();
        let business_id = BusinessId::new();
        let start = Timestamp::now().minus_days(40);
        let mut plan = CurrentPlan::inactive(business_id, start);
        plan.activate(PlanType::Basic, start, start.add_days(30), false).unwrap();
        store.seed_plan(plan);

        let handler = GetCurrentPlanHandler::new(Arc::new(store));
        let plan = handler.handle(GetCurrentPlanQuery { business_id }).await.unwrap();

        assert_eq!(plan.plan_status, PlanStatus::Expired);
    }
}
