use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AppraisalError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::AppraisalResult;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// NPV of one discrete scenario and its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub probability: Rate,
    pub npv: Money,
}

/// Probability-weighted summary of discrete scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValue {
    pub expected_value: Money,
    /// Population standard deviation: sqrt(Σ p (x - E)²).
    pub std_dev: Money,
    /// `std_dev / expected_value`; `None` when the expected value is zero.
    pub coefficient_of_variation: Option<f64>,
}

/// Probabilities for the best/base/worst summary of a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioWeights {
    #[serde(default = "default_best")]
    pub best: Rate,
    #[serde(default = "default_base")]
    pub base: Rate,
    #[serde(default = "default_worst")]
    pub worst: Rate,
}

fn default_best() -> Rate {
    0.25
}
fn default_base() -> Rate {
    0.60
}
fn default_worst() -> Rate {
    0.15
}

impl Default for ScenarioWeights {
    fn default() -> Self {
        Self {
            best: default_best(),
            base: default_base(),
            worst: default_worst(),
        }
    }
}

fn validate_probabilities(outcomes: &[ScenarioOutcome]) -> AppraisalResult<()> {
    if outcomes.is_empty() {
        return Err(AppraisalError::InsufficientData(
            "At least one scenario required".into(),
        ));
    }
    for s in outcomes {
        if !(0.0..=1.0).contains(&s.probability) {
            return Err(AppraisalError::invalid(
                format!("scenario:{} probability", s.name),
                "Probability must be between 0 and 1",
            ));
        }
        if !s.npv.is_finite() {
            return Err(AppraisalError::invalid(
                format!("scenario:{} npv", s.name),
                "NPV must be finite",
            ));
        }
    }
    let total: f64 = outcomes.iter().map(|s| s.probability).sum();
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(AppraisalError::invalid(
            "probabilities",
            format!("Probabilities must sum to 1.0 (got {total})"),
        ));
    }
    Ok(())
}

/// Probability-weighted expected NPV and its population standard deviation.
pub fn scenario_expected_value(outcomes: &[ScenarioOutcome]) -> AppraisalResult<ExpectedValue> {
    validate_probabilities(outcomes)?;

    let expected_value: f64 = outcomes.iter().map(|s| s.probability * s.npv).sum();
    let variance: f64 = outcomes
        .iter()
        .map(|s| s.probability * (s.npv - expected_value).powi(2))
        .sum();
    let std_dev = variance.sqrt();
    let coefficient_of_variation = if expected_value == 0.0 {
        None
    } else {
        Some(std_dev / expected_value)
    };

    Ok(ExpectedValue {
        expected_value,
        std_dev,
        coefficient_of_variation,
    })
}

/// Best/base/worst scenarios from a deterministic base case and a set of
/// simulated NPVs: best is the maximum, worst the minimum.
pub fn best_base_worst(
    base_npv: Money,
    simulated_npvs: &[Money],
    weights: &ScenarioWeights,
) -> AppraisalResult<Vec<ScenarioOutcome>> {
    let mut finite = simulated_npvs.iter().copied().filter(|v| v.is_finite());
    let first = finite.next().ok_or_else(|| {
        AppraisalError::InsufficientData("Best/worst case needs at least one simulated NPV".into())
    })?;
    let (worst, best) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let outcomes = vec![
        ScenarioOutcome {
            name: "base".into(),
            probability: weights.base,
            npv: base_npv,
        },
        ScenarioOutcome {
            name: "best".into(),
            probability: weights.best,
            npv: best,
        },
        ScenarioOutcome {
            name: "worst".into(),
            probability: weights.worst,
            npv: worst,
        },
    ];
    validate_probabilities(&outcomes)?;
    Ok(outcomes)
}

// ---------------------------------------------------------------------------
// Scenario analysis envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub scenarios: Vec<ScenarioOutcome>,
    /// Reference NPV for deviations. Defaults to the expected value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_case: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub probability: Rate,
    pub npv: Money,
    pub deviation_from_base: Money,
    pub deviation_pct: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub results: Vec<ScenarioResult>,
    #[serde(flatten)]
    pub summary: ExpectedValue,
}

/// Summarise discrete scenarios, with each one's deviation from the base case.
pub fn analyze_scenarios(
    input: &ScenarioInput,
) -> AppraisalResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let summary = scenario_expected_value(&input.scenarios)?;
    let base = input.base_case.unwrap_or(summary.expected_value);

    let results = input
        .scenarios
        .iter()
        .map(|s| {
            let deviation = s.npv - base;
            let deviation_pct = if base == 0.0 {
                if deviation != 0.0 {
                    warnings.push(format!(
                        "Base case is zero; cannot compute deviation_pct for scenario '{}'",
                        s.name
                    ));
                }
                None
            } else {
                Some(deviation / base.abs())
            };
            ScenarioResult {
                name: s.name.clone(),
                probability: s.probability,
                npv: s.npv,
                deviation_from_base: deviation,
                deviation_pct,
            }
        })
        .collect();

    if summary.coefficient_of_variation.is_none() {
        warnings.push("Expected value is zero; coefficient of variation undefined".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Probability-weighted scenario analysis (population standard deviation)",
        &serde_json::json!({
            "num_scenarios": input.scenarios.len(),
            "base_case_value": base,
            "probability_tolerance": PROBABILITY_TOLERANCE,
        }),
        warnings,
        elapsed,
        ScenarioOutput { results, summary },
    ))
}
