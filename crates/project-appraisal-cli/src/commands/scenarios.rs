use clap::Args;
use serde_json::Value;

use project_appraisal_core::cash_flow::InputTarget;
use project_appraisal_core::scenarios::{
    self, GridSpec, ScenarioInput, SensitivityInput, SweepVariable,
};

use crate::input;

/// Arguments for probability-weighted scenario analysis
#[derive(Args)]
pub struct ScenarioArgs {
    /// Path to a JSON or YAML file with `scenarios`
    #[arg(long)]
    pub input: Option<String>,

    /// Reference NPV for deviations (defaults to the expected value)
    #[arg(long, allow_hyphen_values = true)]
    pub base_case: Option<f64>,
}

/// Arguments for marginal and two-way sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a JSON or YAML file with `parameters`, `volumes` and `bumps`
    #[arg(long)]
    pub input: Option<String>,

    /// First grid variable as target:min:max:step
    /// (e.g. "volume:new:50000:60000:2500" or "discount_rate:0.1:0.18:0.02")
    #[arg(long)]
    pub var1: Option<String>,

    /// Second grid variable, same format
    #[arg(long)]
    pub var2: Option<String>,
}

/// Parse `target:min:max:step`, where the target itself may hold a line name.
fn parse_sweep(spec: &str) -> Result<SweepVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.rsplitn(4, ':').collect();
    if parts.len() != 4 {
        return Err(format!("Sweep variable must be target:min:max:step, got '{}'", spec).into());
    }
    let (step, max, min, target) = (parts[0], parts[1], parts[2], parts[3]);
    Ok(SweepVariable {
        target: target.parse::<InputTarget>()?,
        min: min.parse()?,
        max: max.parse()?,
        step: step.parse()?,
    })
}

pub fn run_scenarios(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut scenario_input: ScenarioInput = input::load(args.input.as_deref(), "scenarios")?;
    if args.base_case.is_some() {
        scenario_input.base_case = args.base_case;
    }
    let result = scenarios::analyze_scenarios(&scenario_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sens_input: SensitivityInput = input::load(args.input.as_deref(), "sensitivity")?;
    match (&args.var1, &args.var2) {
        (Some(v1), Some(v2)) => {
            sens_input.grid = Some(GridSpec {
                variable_1: parse_sweep(v1)?,
                variable_2: parse_sweep(v2)?,
            });
        }
        (None, None) => {}
        _ => return Err("--var1 and --var2 must be given together".into()),
    }
    let result = scenarios::analyze_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}
