pub mod scenario;
pub mod sensitivity;

pub use scenario::{
    analyze_scenarios, best_base_worst, scenario_expected_value, ExpectedValue, ScenarioInput,
    ScenarioOutcome, ScenarioOutput, ScenarioResult, ScenarioWeights,
};
pub use sensitivity::{
    analyze_sensitivity, marginal_sensitivity, sensitivity_grid, Bump, GridSpec, SensitivityGrid,
    SensitivityInput, SensitivityOutput, SensitivityRow, SweepVariable,
};
