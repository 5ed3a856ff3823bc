//! PlanCatalog port - static plan reference data.

use async_trait::async_trait;

use crate::domain::billing::{Plan, PlanType};
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait PlanCatalog: Send + Sync {
    async fn find(&self, plan_type: PlanType) -> Result<Option<Plan>, DomainError>;

    async fn list(&self) -> Result<Vec<Plan>, DomainError>;
}
