#![cfg(feature = "monte_carlo")]

mod common;

use pretty_assertions::assert_eq;
use project_appraisal_core::cash_flow::InputTarget;
use project_appraisal_core::monte_carlo::{
    run_monte_carlo, simulate, Distribution, MonteCarloInput, SimulatedVariable, SimulationConfig,
};
use project_appraisal_core::scenarios::ScenarioWeights;

use common::{golf_clubs, golf_volumes};

/// Each line's volume drawn from a normal with a 10% standard deviation.
fn golf_config(iterations: u32, workers: Option<usize>) -> SimulationConfig {
    let volume = |line: &str, mean: f64| SimulatedVariable {
        target: InputTarget::Volume { line: line.into() },
        distribution: Distribution::Normal {
            mean,
            std_dev: mean * 0.1,
        },
    };
    SimulationConfig {
        iterations,
        seed: 0,
        workers,
        variables: vec![
            volume("new", 55_000.0),
            volume("high", 13_000.0),
            volume("cheap", 10_000.0),
        ],
    }
}

#[test]
fn test_repeated_runs_are_identical() {
    let a = simulate(&golf_clubs(), &golf_volumes(), &golf_config(1_000, None)).unwrap();
    let b = simulate(&golf_clubs(), &golf_volumes(), &golf_config(1_000, None)).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn test_worker_count_does_not_change_batch() {
    let single = simulate(&golf_clubs(), &golf_volumes(), &golf_config(2_000, Some(1))).unwrap();
    for workers in [2, 4, 7] {
        let multi =
            simulate(&golf_clubs(), &golf_volumes(), &golf_config(2_000, Some(workers))).unwrap();
        assert_eq!(single, multi, "workers = {workers}");
    }
}

#[test]
fn test_golf_club_distribution_is_centred_on_base_case() {
    let batch = simulate(&golf_clubs(), &golf_volumes(), &golf_config(5_000, None)).unwrap();
    let mean = batch.npv.mean.unwrap();
    // Base case NPV is about 20.73M and NPV is linear in volumes
    assert!((mean - 20_731_665.0).abs() < 500_000.0, "mean={mean}");
    let sd = batch.npv.std_dev.unwrap();
    assert!(sd > 0.0);
    let (p25, median, p75) = (
        batch.npv.p25.unwrap(),
        batch.npv.median.unwrap(),
        batch.npv.p75.unwrap(),
    );
    assert!(batch.npv.min.unwrap() <= p25 && p25 <= median && median <= p75);
    assert!(p75 <= batch.npv.max.unwrap());
    assert_eq!(batch.irr.count + batch.irr.undefined_count, 5_000);
}

#[test]
fn test_undefined_irr_is_counted_not_fatal() {
    // Price far below variable cost: every iteration loses money forever
    let mut params = golf_clubs();
    for line in &mut params.product_lines {
        line.unit_price = 1.0;
    }
    let batch = simulate(&params, &golf_volumes(), &golf_config(200, None)).unwrap();
    assert_eq!(batch.npv.count, 200);
    assert_eq!(batch.payback.count, 0);
    assert_eq!(batch.payback.undefined_count, 200);
    assert_eq!(batch.payback.mean, None);
    assert_eq!(batch.irr.count + batch.irr.undefined_count, 200);
    assert!(batch.irr.undefined_count > 0);
}

#[test]
fn test_run_monte_carlo_best_base_worst() {
    let input = MonteCarloInput {
        parameters: golf_clubs(),
        volumes: golf_volumes(),
        config: golf_config(1_000, Some(2)),
        scenario_weights: ScenarioWeights::default(),
    };
    let out = run_monte_carlo(&input).unwrap().result;
    let bbw = &out.best_base_worst;
    assert_eq!(bbw.outcomes.len(), 3);
    assert_eq!(bbw.outcomes[0].npv, out.base_case.npv);
    let expected =
        0.60 * bbw.outcomes[0].npv + 0.25 * bbw.outcomes[1].npv + 0.15 * bbw.outcomes[2].npv;
    approx::assert_relative_eq!(bbw.summary.expected_value, expected, epsilon = 1e-6);
    assert!(bbw.summary.coefficient_of_variation.is_some());
}

#[test]
fn test_monte_carlo_input_defaults() {
    let json = serde_json::json!({
        "parameters": serde_json::to_value(golf_clubs()).unwrap(),
        "volumes": serde_json::to_value(golf_volumes()).unwrap(),
        "config": {
            "variables": [
                {"target": {"input": "volume", "line": "new"},
                 "distribution": {"type": "normal", "mean": 55000, "std_dev": 5500}}
            ]
        }
    });
    let input: MonteCarloInput = serde_json::from_value(json).unwrap();
    assert_eq!(input.config.iterations, 10_000);
    assert_eq!(input.scenario_weights, ScenarioWeights::default());
}
