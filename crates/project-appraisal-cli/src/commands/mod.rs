pub mod appraisal;
pub mod metrics;
pub mod monte_carlo;
pub mod scenarios;
