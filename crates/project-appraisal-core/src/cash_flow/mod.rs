pub mod model;
pub mod params;
pub mod target;

pub use model::{build_cash_flows, project_cash_flows, CashFlowProjection, PeriodDetail};
pub use params::{
    DepreciationPolicy, ProductLine, SalesEffect, SalesVolumes, ScenarioParameters, SetupCost,
    TaxLossPolicy, MAX_HORIZON,
};
pub use target::InputTarget;
