//! ExpireLapsedPlansHandler - moves ACTIVE plans past their expiry to EXPIRED.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::Timestamp;
use crate::ports::{business_tag, BillingUnitOfWork, CacheInvalidator, CurrentPlanRepository};

pub struct ExpireLapsedPlansHandler {
    plans: Arc<dyn CurrentPlanRepository>,
    unit_of_work: Arc<dyn BillingUnitOfWork>,
    cache: Arc<dyn CacheInvalidator>,
    batch_size: u32,
}

impl ExpireLapsedPlansHandler {
    pub fn new(
        plans: Arc<dyn CurrentPlanRepository>,
        unit_of_work: Arc<dyn BillingUnitOfWork>,
        cache: Arc<dyn CacheInvalidator>,
        batch_size: u32,
    ) -> Self {
        Self {
            plans,
            unit_of_work,
            cache,
            batch_size: batch_size.max(1),
        }
    }

    /// Expires one batch of lapsed plans. Returns how many were expired.
    pub async fn handle(&self, now: Timestamp) -> Result<usize, BillingError> {
        let lapsed = self.plans.find_lapsed(now, self.batch_size).await?;
        let mut expired = 0;

        for mut plan in lapsed {
            if !plan.expire_if_lapsed(now) {
                continue;
            }
            if !self.unit_of_work.expire_plan(&plan).await? {
                continue;
            }
            expired += 1;
            tracing::info!(
                business_id = %plan.business_id,
                plan = %plan.plan_type,
                "Plan expired"
            );
            if let Err(e) = self.cache.invalidate_tags(&[business_tag(&plan.business_id)]).await {
                tracing::warn!(business_id = %plan.business_id, error = %e, "Cache invalidation failed");
            }
        }

        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, RecordingCacheInvalidator};
    use crate::domain::billing::{CurrentPlan, PlanStatus, PlanType, Trial};
    use crate::domain::foundation::BusinessId;

    fn active_until(business_id: BusinessId, activated: Timestamp, days: i64) -> CurrentPlan {
        let mut plan = CurrentPlan::inactive(business_id, activated);
        plan.activate(PlanType::Basic, activated, activated.add_days(days), false).unwrap();
        plan
    }

    #[tokio::test]
    async fn expires_only_lapsed_plans() {
        let store = InMemoryBillingStore::new();
        let cache = RecordingCacheInvalidator::new();
        let now = Timestamp::now();
        let lapsed = BusinessId::new();
        let current = BusinessId::new();
        store.seed_plan(active_until(lapsed, now.minus_days(31), 30));
        store.seed_plan(active_until(current, now.minus_days(1), 30));

        let handler = ExpireLapsedPlansHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(cache.clone()),
            100,
        );

        assert_eq!(handler.handle(now).await.unwrap(), 1);
        assert_eq!(store.plan(&lapsed).unwrap().plan_status, PlanStatus::Expired);
        assert_eq!(store.plan(&current).unwrap().plan_status, PlanStatus::Active);
        assert_eq!(cache.invalidated_tags(), vec![business_tag(&lapsed)]);

        assert_eq!(handler.handle(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn expiring_trial_plan_deactivates_trial() {
        let store = InMemoryBillingStore::new();
        let business_id = BusinessId::new();
        let start = Timestamp::now().minus_days(20);
        let trial = Trial::new(business_id, PlanType::Premium, start, start.add_days(14), None);
        store.start_trial(&trial).await.unwrap();

        let handler = ExpireLapsedPlansHandler::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(RecordingCacheInvalidator::new()),
            10,
        );
        handler.handle(Timestamp::now()).await.unwrap();

        let plan = store.plan(&business_id).unwrap();
        assert_eq!(plan.plan_status, PlanStatus::Expired);
        assert!(!plan.is_trial);
        assert!(!store.trial(&business_id).unwrap().is_active);
    }
}
