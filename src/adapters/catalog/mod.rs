//! Plan catalog adapters.

mod static_plan_catalog;

pub use static_plan_catalog::StaticPlanCatalog;
