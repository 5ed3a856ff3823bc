//! Plan catalog backed by built-in defaults or a YAML file.
//!
//! ```yaml
//! plans:
//!   - type: BASIC
//!     price_cents: 500000
//!     currency: ARS
//!     limits: { max_products: 100, max_images: 500 }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::billing::{Plan, PlanLimits, PlanType};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::PlanCatalog;

#[derive(Debug, Clone)]
pub struct StaticPlanCatalog {
    plans: BTreeMap<PlanType, Plan>,
}

#[derive(Deserialize)]
struct CatalogFile {
    plans: Vec<Plan>,
}

impl StaticPlanCatalog {
    /// Built-in catalog priced in `currency`.
    pub fn with_defaults(currency: &str) -> Self {
        let plan = |plan_type, price_cents, max_products, max_images| Plan {
            plan_type,
            price_cents,
            currency: currency.to_string(),
            limits: PlanLimits {
                max_products,
                max_images,
            },
        };
        Self::from_plans(vec![
            plan(PlanType::Free, 0, 10, 30),
            plan(PlanType::Basic, 500_000, 100, 500),
            plan(PlanType::Premium, 1_200_000, 1_000, 5_000),
        ])
    }

    pub fn from_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.plan_type, p)).collect(),
        }
    }

    /// Parses a catalog document.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML, a negative price or a priced FREE plan.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DomainError> {
        let file: CatalogFile = serde_yaml::from_str(yaml)
            .map_err(|e| DomainError::validation("plan_catalog", format!("Invalid plan catalog: {}", e)))?;

        for plan in &file.plans {
            if plan.price_cents < 0 {
                return Err(DomainError::validation(
                    "plan_catalog",
                    format!("{} has a negative price", plan.plan_type),
                ));
            }
            if !plan.plan_type.is_paid() && plan.price_cents != 0 {
                return Err(DomainError::validation("plan_catalog", "FREE plan must cost 0"));
            }
        }
        Ok(Self::from_plans(file.plans))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Cannot read plan catalog {}: {}", path.display(), e),
            )
        })?;
        Self::from_yaml_str(&yaml)
    }
}

#[async_trait]
impl PlanCatalog for StaticPlanCatalog {
    async fn find(&self, plan_type: PlanType) -> Result<Option<Plan>, DomainError> {
        Ok(self.plans.get(&plan_type).cloned())
    }

    async fn list(&self) -> Result<Vec<Plan>, DomainError> {
        Ok(self.plans.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_cover_every_tier() {
        let catalog = StaticPlanCatalog::with_defaults("ARS");
        let plans = catalog.list().await.unwrap();

        assert_eq!(plans.len(), 3);
        assert_eq!(catalog.find(PlanType::Free).await.unwrap().unwrap().price_cents, 0);
        assert_eq!(catalog.find(PlanType::Basic).await.unwrap().unwrap().currency, "ARS");
    }

    #[tokio::test]
    async fn yaml_catalog_overrides_defaults() {
        let yaml = r#"
plans:
  - type: BASIC
    price_cents: 1999
    currency: USD
    limits: { max_products: 50, max_images: 100 }
"#;
        let catalog = StaticPlanCatalog::from_yaml_str(yaml).unwrap();
        let basic = catalog.find(PlanType::Basic).await.unwrap().unwrap();

        assert_eq!(basic.price_cents, 1999);
        assert_eq!(basic.limits.max_products, 50);
        assert!(catalog.find(PlanType::Premium).await.unwrap().is_none());
    }

    #[test]
    fn priced_free_plan_is_rejected() {
        let yaml = r#"
plans:
  - type: FREE
    price_cents: 100
    currency: USD
    limits: { max_products: 1, max_images: 1 }
"#;
        assert!(StaticPlanCatalog::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn malformed_yaml_is_rejected() {
        assert!(StaticPlanCatalog::from_yaml_str("plans: [ {type: GOLD} ]").is_err());
    }
}
