use clap::Args;
use serde_json::Value;

use project_appraisal_core::monte_carlo::{self, MonteCarloInput};

use crate::input;

/// Arguments for Monte Carlo simulation of a scenario
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to a JSON or YAML file with `parameters`, `volumes` and `config`
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of iterations
    #[arg(long)]
    pub iterations: Option<u32>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads (results do not depend on this)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Drop per-iteration results from the output, keeping the summaries
    #[arg(long)]
    pub summary_only: bool,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut mc_input: MonteCarloInput = input::load(args.input.as_deref(), "monte-carlo")?;
    if let Some(iterations) = args.iterations {
        mc_input.config.iterations = iterations;
    }
    if let Some(seed) = args.seed {
        mc_input.config.seed = seed;
    }
    if args.workers.is_some() {
        mc_input.config.workers = args.workers;
    }

    let mut result = monte_carlo::run_monte_carlo(&mc_input)?;
    if args.summary_only {
        result.result.batch.results.clear();
    }
    Ok(serde_json::to_value(result)?)
}
