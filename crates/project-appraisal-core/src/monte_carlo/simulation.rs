use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::distribution::{Distribution, Sampler};
use super::rng::iteration_rng;
use super::statistics::SummaryStatistics;
use crate::cash_flow::{build_cash_flows, InputTarget, SalesVolumes, ScenarioParameters};
use crate::error::AppraisalError;
use crate::scenarios::{
    best_base_worst, scenario_expected_value, ExpectedValue, ScenarioOutcome, ScenarioWeights,
};
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::valuation::{evaluate, ValuationResult};
use crate::AppraisalResult;

const MAX_ITERATIONS: u32 = 1_000_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An uncertain input and the distribution its value is drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedVariable {
    pub target: InputTarget,
    pub distribution: Distribution,
}

/// Monte Carlo run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub seed: u64,
    /// Worker threads. `None` or 1 runs on the calling thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default)]
    pub variables: Vec<SimulatedVariable>,
}

fn default_iterations() -> u32 {
    10_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            seed: 0,
            workers: None,
            variables: Vec::new(),
        }
    }
}

/// Every iteration's valuation, in iteration order, with per-metric
/// summaries over the defined values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationBatch {
    pub iterations: u32,
    pub seed: u64,
    pub results: Vec<ValuationResult>,
    pub npv: SummaryStatistics,
    pub irr: SummaryStatistics,
    pub mirr: SummaryStatistics,
    pub payback: SummaryStatistics,
    pub discounted_payback: SummaryStatistics,
}

impl SimulationBatch {
    pub fn npv_values(&self) -> Vec<Money> {
        self.results.iter().map(|r| r.npv).collect()
    }
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

fn tag_iteration(error: AppraisalError, iteration: u32) -> AppraisalError {
    match error {
        AppraisalError::InvalidParameter { field, reason } => AppraisalError::InvalidParameter {
            field: format!("iteration {iteration}: {field}"),
            reason,
        },
        other => other,
    }
}

fn run_iteration(
    iteration: u32,
    seed: u64,
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
    samplers: &[(InputTarget, Sampler)],
) -> AppraisalResult<ValuationResult> {
    let mut rng = iteration_rng(seed, u64::from(iteration));
    let mut p = params.clone();
    let mut v = volumes.clone();
    for (target, sampler) in samplers {
        target.set(&mut p, &mut v, sampler.sample(&mut rng))?;
    }
    let series = build_cash_flows(&p, &v)?;
    evaluate(&series, p.discount_rate)
}

type IterationResults = Vec<AppraisalResult<ValuationResult>>;

#[cfg(feature = "parallel")]
fn run_parallel<F>(workers: usize, iterations: u32, f: F) -> AppraisalResult<IterationResults>
where
    F: Fn(u32) -> AppraisalResult<ValuationResult> + Sync + Send,
{
    use rayon::prelude::*;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| AppraisalError::invalid("workers", e.to_string()))?;
    // Indexed collect keeps iteration order
    Ok(pool.install(|| (0..iterations).into_par_iter().map(f).collect()))
}

#[cfg(not(feature = "parallel"))]
fn run_parallel<F>(workers: usize, iterations: u32, f: F) -> AppraisalResult<IterationResults>
where
    F: Fn(u32) -> AppraisalResult<ValuationResult> + Sync + Send,
{
    warn!(workers, "built without the `parallel` feature; running on one thread");
    Ok((0..iterations).map(f).collect())
}

/// Run a reproducible Monte Carlo batch.
///
/// Iteration `i` applies draws from its own stream `(seed, i)` to a fresh
/// copy of the inputs, so the batch is identical for any worker count. A
/// draw that makes the inputs invalid fails the whole batch.
pub fn simulate(
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
    config: &SimulationConfig,
) -> AppraisalResult<SimulationBatch> {
    params.validate()?;
    params.validate_volumes(volumes)?;

    if config.iterations == 0 || config.iterations > MAX_ITERATIONS {
        return Err(AppraisalError::invalid(
            "iterations",
            format!("Must be between 1 and {MAX_ITERATIONS}"),
        ));
    }
    if config.workers == Some(0) {
        return Err(AppraisalError::invalid("workers", "Must be at least 1"));
    }
    if config.variables.is_empty() {
        return Err(AppraisalError::InsufficientData(
            "At least one simulated variable required".into(),
        ));
    }

    let samplers = config
        .variables
        .iter()
        .map(|var| {
            let field = format!("variables:{}", var.target);
            var.target.current(params, volumes)?;
            Ok((var.target.clone(), var.distribution.sampler(&field)?))
        })
        .collect::<AppraisalResult<Vec<_>>>()?;

    debug!(
        iterations = config.iterations,
        seed = config.seed,
        workers = config.workers.unwrap_or(1),
        variables = samplers.len(),
        "starting simulation"
    );

    let one = |i: u32| {
        run_iteration(i, config.seed, params, volumes, &samplers).map_err(|e| tag_iteration(e, i))
    };
    let outcomes = match config.workers {
        Some(workers) if workers > 1 => run_parallel(workers, config.iterations, one)?,
        _ => (0..config.iterations).map(one).collect(),
    };
    // First failure in iteration order
    let results = outcomes.into_iter().collect::<AppraisalResult<Vec<_>>>()?;

    let batch = SimulationBatch {
        iterations: config.iterations,
        seed: config.seed,
        npv: SummaryStatistics::from_values(results.iter().map(|r| Some(r.npv))),
        irr: SummaryStatistics::from_values(results.iter().map(|r| r.irr.value())),
        mirr: SummaryStatistics::from_values(results.iter().map(|r| r.mirr.value())),
        payback: SummaryStatistics::from_values(
            results.iter().map(|r| r.payback_period.value().map(|t| t as f64)),
        ),
        discounted_payback: SummaryStatistics::from_values(
            results
                .iter()
                .map(|r| r.discounted_payback_period.value().map(|t| t as f64)),
        ),
        results,
    };

    if batch.irr.undefined_count > 0 {
        warn!(
            undefined = batch.irr.undefined_count,
            "IRR undefined in some iterations; excluded from IRR statistics"
        );
    }
    debug!(
        npv_mean = ?batch.npv.mean,
        npv_std_dev = ?batch.npv.std_dev,
        "simulation finished"
    );

    Ok(batch)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloInput {
    pub parameters: ScenarioParameters,
    pub volumes: SalesVolumes,
    #[serde(default)]
    pub config: SimulationConfig,
    #[serde(default)]
    pub scenario_weights: ScenarioWeights,
}

/// Deterministic base case, simulated best case and simulated worst case,
/// weighted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestBaseWorst {
    pub outcomes: Vec<ScenarioOutcome>,
    #[serde(flatten)]
    pub summary: ExpectedValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub base_case: ValuationResult,
    #[serde(flatten)]
    pub batch: SimulationBatch,
    pub best_base_worst: BestBaseWorst,
}

/// Base case, simulation batch and best/base/worst summary of a scenario.
pub fn run_monte_carlo(
    input: &MonteCarloInput,
) -> AppraisalResult<ComputationOutput<MonteCarloOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base_series = build_cash_flows(&input.parameters, &input.volumes)?;
    let base_case = evaluate(&base_series, input.parameters.discount_rate)?;
    let batch = simulate(&input.parameters, &input.volumes, &input.config)?;

    let outcomes = best_base_worst(base_case.npv, &batch.npv_values(), &input.scenario_weights)?;
    let summary = scenario_expected_value(&outcomes)?;

    if batch.irr.undefined_count > 0 {
        warnings.push(format!(
            "IRR undefined in {} of {} iterations",
            batch.irr.undefined_count, batch.iterations
        ));
    }
    let ambiguous = batch.results.iter().filter(|r| r.has_ambiguous_root()).count();
    if ambiguous > 0 {
        warnings.push(format!(
            "{ambiguous} iterations change sign more than once; IRR may not be unique"
        ));
    }
    if batch.payback.undefined_count > 0 {
        warnings.push(format!(
            "Outlay not recovered in {} iterations",
            batch.payback.undefined_count
        ));
    }

    let output = MonteCarloOutput {
        base_case,
        batch,
        best_base_worst: BestBaseWorst { outcomes, summary },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo simulation of after-tax project cash flows",
        &serde_json::json!({
            "iterations": input.config.iterations,
            "seed": input.config.seed,
            "variables": input.config.variables,
            "discount_rate": input.parameters.discount_rate,
            "scenario_weights": input.scenario_weights,
            "std_dev": "sample (n - 1)",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::{DepreciationPolicy, ProductLine, SalesEffect, TaxLossPolicy};

    const SEED: u64 = 42;

    fn params() -> ScenarioParameters {
        ScenarioParameters {
            product_lines: vec![ProductLine {
                name: "widget".into(),
                unit_price: 10.0,
                unit_variable_cost: 4.0,
                effect: SalesEffect::Incremental,
            }],
            fixed_costs: 100.0,
            capital_expenditure: 1000.0,
            depreciation: DepreciationPolicy::StraightLine { life: None },
            working_capital: 50.0,
            salvage_value: None,
            tax_rate: 0.25,
            tax_losses: TaxLossPolicy::Credit,
            discount_rate: 0.10,
            horizon: 5,
            setup_costs: vec![],
        }
    }

    fn volumes() -> SalesVolumes {
        SalesVolumes::from([("widget".to_string(), 100.0)])
    }

    fn config(iterations: u32) -> SimulationConfig {
        SimulationConfig {
            iterations,
            seed: SEED,
            workers: None,
            variables: vec![SimulatedVariable {
                target: InputTarget::Volume {
                    line: "widget".into(),
                },
                distribution: Distribution::Normal {
                    mean: 100.0,
                    std_dev: 10.0,
                },
            }],
        }
    }

    #[test]
    fn test_batch_length_and_order() {
        let batch = simulate(&params(), &volumes(), &config(200)).unwrap();
        assert_eq!(batch.results.len(), 200);
        assert_eq!(batch.npv.count, 200);
        assert_eq!(batch.npv.undefined_count, 0);
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = simulate(&params(), &volumes(), &config(300)).unwrap();
        let b = simulate(&params(), &volumes(), &config(300)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_prefix_stability() {
        // Iteration i's draw does not depend on the batch size
        let short = simulate(&params(), &volumes(), &config(10)).unwrap();
        let long = simulate(&params(), &volumes(), &config(50)).unwrap();
        assert_eq!(short.results[..], long.results[..10]);
    }

    #[test]
    fn test_different_seed_differs() {
        let a = simulate(&params(), &volumes(), &config(50)).unwrap();
        let mut c = config(50);
        c.seed = SEED + 1;
        let b = simulate(&params(), &volumes(), &c).unwrap();
        assert_ne!(a.npv.mean, b.npv.mean);
    }

    #[test]
    fn test_invalid_draw_fails_with_iteration() {
        let mut c = config(100);
        c.variables = vec![SimulatedVariable {
            target: InputTarget::DiscountRate,
            distribution: Distribution::Uniform { min: -3.0, max: -2.0 },
        }];
        match simulate(&params(), &volumes(), &c) {
            Err(AppraisalError::InvalidParameter { field, .. }) => {
                assert!(field.starts_with("iteration 0:"), "field={field}")
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn test_config_validation() {
        let mut c = config(0);
        assert!(simulate(&params(), &volumes(), &c).is_err());
        c.iterations = 10;
        c.workers = Some(0);
        assert!(simulate(&params(), &volumes(), &c).is_err());
        c.workers = None;
        c.variables.clear();
        assert!(simulate(&params(), &volumes(), &c).is_err());
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut c = config(10);
        c.variables[0].target = InputTarget::UnitPrice {
            line: "gadget".into(),
        };
        assert!(simulate(&params(), &volumes(), &c).is_err());
    }

    #[test]
    fn test_run_monte_carlo_envelope() {
        let input = MonteCarloInput {
            parameters: params(),
            volumes: volumes(),
            config: config(500),
            scenario_weights: ScenarioWeights::default(),
        };
        let out = run_monte_carlo(&input).unwrap();
        let r = &out.result;
        let best = r.best_base_worst.outcomes[1].npv;
        let worst = r.best_base_worst.outcomes[2].npv;
        assert_eq!(Some(best), r.batch.npv.max);
        assert_eq!(Some(worst), r.batch.npv.min);
        assert!(worst <= r.base_case.npv && r.base_case.npv <= best);
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }

    #[test]
    fn test_default_iterations() {
        let c: SimulationConfig = serde_json::from_str(r#"{"variables": []}"#).unwrap();
        assert_eq!(c.iterations, 10_000);
        assert_eq!(c.seed, 0);
    }
}
