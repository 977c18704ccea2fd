pub mod appraisal;
pub mod irr;
pub mod mirr;
pub mod payback;
pub mod perpetuity;

pub use appraisal::{
    appraise_project, evaluate, project_scenario, value_cash_flows, Advisory, AppraisalInput,
    AppraisalOutput, SeriesInput, SeriesOutput, ValuationResult,
};
pub use irr::{irr, IrrOutcome, IRR_LOWER_BOUND, IRR_UPPER_BOUND};
pub use mirr::{mirr, mirr_with_rates};
pub use payback::{discounted_payback_period, fractional_payback, payback_period};
pub use perpetuity::{
    appraise_perpetuities, GrowingStream, PerpetuityInput, PerpetuityOutput, StreamMetrics,
};
