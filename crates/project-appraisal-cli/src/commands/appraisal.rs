use clap::Args;
use serde_json::Value;

use project_appraisal_core::valuation::{self, AppraisalInput};

use crate::input;

/// Arguments shared by the scenario-driven commands
#[derive(Args)]
pub struct AppraisalArgs {
    /// Path to a JSON or YAML file with `parameters` and `volumes`
    #[arg(long)]
    pub input: Option<String>,

    /// Override the scenario's cost of capital
    #[arg(long)]
    pub discount_rate: Option<f64>,

    /// Override the number of operating periods
    #[arg(long)]
    pub horizon: Option<usize>,
}

fn load(args: &AppraisalArgs, command: &str) -> Result<AppraisalInput, Box<dyn std::error::Error>> {
    let mut appraisal: AppraisalInput = input::load(args.input.as_deref(), command)?;
    if let Some(rate) = args.discount_rate {
        appraisal.parameters.discount_rate = rate;
    }
    if let Some(horizon) = args.horizon {
        appraisal.parameters.horizon = horizon;
    }
    Ok(appraisal)
}

pub fn run_cash_flows(args: AppraisalArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let appraisal = load(&args, "cash-flows")?;
    let result = valuation::project_scenario(&appraisal)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_appraise(args: AppraisalArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let appraisal = load(&args, "appraise")?;
    let result = valuation::appraise_project(&appraisal)?;
    Ok(serde_json::to_value(result)?)
}
