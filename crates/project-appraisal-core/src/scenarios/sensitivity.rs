use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::cash_flow::{project_cash_flows, InputTarget, SalesVolumes, ScenarioParameters};
use crate::error::AppraisalError;
use crate::time_value::npv;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::AppraisalResult;

const MAX_SWEEP_POINTS: usize = 1_000;

// ---------------------------------------------------------------------------
// Marginal (one-at-a-time) sensitivity
// ---------------------------------------------------------------------------

/// Shift one input by `delta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bump {
    pub target: InputTarget,
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Bump {
    fn label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{} {:+}", self.target, self.delta))
    }
}

/// First-period breakdown and NPV of one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub label: String,
    pub revenue: Money,
    pub variable_cost: Money,
    pub fixed_costs: Money,
    pub taxable_income: Money,
    pub taxes: Money,
    pub after_tax_cash_flow: Money,
    pub npv: Money,
    pub npv_change: Money,
}

fn row_for(
    label: String,
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
    base_npv: Option<Money>,
) -> AppraisalResult<SensitivityRow> {
    let projection = project_cash_flows(params, volumes)?;
    let first = projection.periods.first().ok_or_else(|| {
        AppraisalError::InsufficientData("Projection has no operating period".into())
    })?;
    let value = npv(&projection.series, params.discount_rate)?;
    Ok(SensitivityRow {
        label,
        revenue: first.revenue,
        variable_cost: first.variable_cost,
        fixed_costs: first.fixed_costs,
        taxable_income: first.taxable_income,
        taxes: first.taxes,
        after_tax_cash_flow: first.operating_cash_flow,
        npv: value,
        npv_change: base_npv.map_or(0.0, |b| value - b),
    })
}

/// Base case plus one row per bump, each applied alone to a fresh copy.
pub fn marginal_sensitivity(
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
    bumps: &[Bump],
) -> AppraisalResult<Vec<SensitivityRow>> {
    let base = row_for("base case".into(), params, volumes, None)?;
    let base_npv = base.npv;
    let mut rows = Vec::with_capacity(bumps.len() + 1);
    rows.push(base);

    for bump in bumps {
        let mut p = params.clone();
        let mut v = volumes.clone();
        bump.target.shift(&mut p, &mut v, bump.delta)?;
        rows.push(row_for(bump.label(), &p, &v, Some(base_npv))?);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Two-way grid
// ---------------------------------------------------------------------------

/// An input swept from `min` to `max` in steps of `step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepVariable {
    pub target: InputTarget,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub variable_1: InputTarget,
    pub variable_2: InputTarget,
    pub variable_1_values: Vec<f64>,
    pub variable_2_values: Vec<f64>,
    /// `matrix[i][j]` is the NPV at `variable_1_values[i]`,
    /// `variable_2_values[j]`; `None` where those inputs are invalid.
    pub matrix: Vec<Vec<Option<Money>>>,
    pub base_case_npv: Money,
    /// Cell closest to the unperturbed inputs (row, col).
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values from min to max with step, max included.
fn generate_sweep_values(var: &SweepVariable) -> AppraisalResult<Vec<f64>> {
    let field = format!("variable:{}", var.target);
    if !(var.min.is_finite() && var.max.is_finite() && var.step.is_finite()) {
        return Err(AppraisalError::invalid(field, "Sweep bounds must be finite"));
    }
    if var.step <= 0.0 {
        return Err(AppraisalError::invalid(field, "Step must be positive"));
    }
    if var.min > var.max {
        return Err(AppraisalError::invalid(field, "Min must be <= max"));
    }

    let span = (var.max - var.min) / var.step;
    if span >= MAX_SWEEP_POINTS as f64 {
        return Err(AppraisalError::invalid(
            field,
            format!("Sweep exceeds {MAX_SWEEP_POINTS} points"),
        ));
    }
    // Tolerate rounding in (max - min) / step
    let steps = (span + 1e-9).floor() as usize;
    let mut values: Vec<f64> = (0..=steps).map(|i| var.min + i as f64 * var.step).collect();
    if let Some(&last) = values.last() {
        if var.max - last > var.step * 1e-9 {
            values.push(var.max);
        }
    }
    Ok(values)
}

fn closest_index(values: &[f64], target: f64) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - target)
                .abs()
                .partial_cmp(&(*b - target).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// NPV over every combination of two swept inputs.
///
/// Cells whose inputs fail validation are left empty and reported in the
/// returned warnings.
pub fn sensitivity_grid(
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
    variable_1: &SweepVariable,
    variable_2: &SweepVariable,
) -> AppraisalResult<(SensitivityGrid, Vec<String>)> {
    if variable_1.target == variable_2.target {
        return Err(AppraisalError::invalid(
            "variable_2",
            "Must differ from variable_1",
        ));
    }
    let v1_values = generate_sweep_values(variable_1)?;
    let v2_values = generate_sweep_values(variable_2)?;
    let base_1 = variable_1.target.current(params, volumes)?;
    let base_2 = variable_2.target.current(params, volumes)?;
    let base_case_npv = npv(
        &project_cash_flows(params, volumes)?.series,
        params.discount_rate,
    )?;

    let mut warnings = Vec::new();
    let mut matrix = Vec::with_capacity(v1_values.len());
    for &x in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for &y in &v2_values {
            let mut p = params.clone();
            let mut v = volumes.clone();
            variable_1.target.set(&mut p, &mut v, x)?;
            variable_2.target.set(&mut p, &mut v, y)?;
            let cell =
                project_cash_flows(&p, &v).and_then(|proj| npv(&proj.series, p.discount_rate));
            match cell {
                Ok(value) => row.push(Some(value)),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({x}, {y}): {e}"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }
    debug!(
        rows = v1_values.len(),
        cols = v2_values.len(),
        failed = warnings.len(),
        "evaluated sensitivity grid"
    );

    let base_case_position = (
        closest_index(&v1_values, base_1),
        closest_index(&v2_values, base_2),
    );

    Ok((
        SensitivityGrid {
            variable_1: variable_1.target.clone(),
            variable_2: variable_2.target.clone(),
            variable_1_values: v1_values,
            variable_2_values: v2_values,
            matrix,
            base_case_npv,
            base_case_position,
        },
        warnings,
    ))
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpec {
    pub variable_1: SweepVariable,
    pub variable_2: SweepVariable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub parameters: ScenarioParameters,
    pub volumes: SalesVolumes,
    #[serde(default)]
    pub bumps: Vec<Bump>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub marginal: Vec<SensitivityRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<SensitivityGrid>,
}

/// Marginal table (when bumps are given) and two-way grid (when requested).
pub fn analyze_sensitivity(
    input: &SensitivityInput,
) -> AppraisalResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.bumps.is_empty() && input.grid.is_none() {
        return Err(AppraisalError::InsufficientData(
            "Provide at least one bump or a grid".into(),
        ));
    }

    let marginal = if input.bumps.is_empty() {
        Vec::new()
    } else {
        marginal_sensitivity(&input.parameters, &input.volumes, &input.bumps)?
    };

    let grid = match &input.grid {
        Some(spec) => {
            let (grid, grid_warnings) = sensitivity_grid(
                &input.parameters,
                &input.volumes,
                &spec.variable_1,
                &spec.variable_2,
            )?;
            warnings.extend(grid_warnings);
            Some(grid)
        }
        None => None,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "One-at-a-time and two-way NPV sensitivity",
        &serde_json::json!({
            "bumps": input.bumps.len(),
            "grid": input.grid.as_ref().map(|g| {
                [g.variable_1.target.to_string(), g.variable_2.target.to_string()]
            }),
            "discount_rate": input.parameters.discount_rate,
        }),
        warnings,
        elapsed,
        SensitivityOutput { marginal, grid },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::{DepreciationPolicy, ProductLine, SalesEffect, TaxLossPolicy};
    use approx::assert_relative_eq;

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
            working_capital: 0.0,
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

    fn sweep(target: InputTarget, min: f64, max: f64, step: f64) -> SweepVariable {
        SweepVariable {
            target,
            min,
            max,
            step,
        }
    }

    #[test]
    fn test_marginal_price_bump() {
        let bumps = [Bump {
            target: InputTarget::UnitPrice {
                line: "widget".into(),
            },
            delta: 1.0,
            label: Some("price +1".into()),
        }];
        let rows = marginal_sensitivity(&params(), &volumes(), &bumps).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "base case");
        assert_eq!(rows[0].npv_change, 0.0);
        // +100 revenue, +25 tax → +75 per period
        assert_relative_eq!(rows[1].revenue - rows[0].revenue, 100.0);
        assert_relative_eq!(rows[1].taxes - rows[0].taxes, 25.0);
        assert_relative_eq!(
            rows[1].after_tax_cash_flow - rows[0].after_tax_cash_flow,
            75.0,
            epsilon = 1e-9
        );
        assert!(rows[1].npv_change > 0.0);
    }

    #[test]
    fn test_generate_sweep_values_includes_max() {
        let v = generate_sweep_values(&sweep(InputTarget::FixedCosts, 0.0, 1.0, 0.3)).unwrap();
        assert_eq!(v.len(), 5);
        assert_eq!(v.last().copied(), Some(1.0));

        let v = generate_sweep_values(&sweep(InputTarget::DiscountRate, 0.05, 0.15, 0.05)).unwrap();
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_generate_sweep_values_rejects_bad_ranges() {
        assert!(generate_sweep_values(&sweep(InputTarget::FixedCosts, 0.0, 1.0, 0.0)).is_err());
        assert!(generate_sweep_values(&sweep(InputTarget::FixedCosts, 2.0, 1.0, 0.1)).is_err());
        assert!(generate_sweep_values(&sweep(InputTarget::FixedCosts, 0.0, 1e9, 1.0)).is_err());
    }

    #[test]
    fn test_grid_shape_and_base_position() {
        let (grid, warnings) = sensitivity_grid(
            &params(),
            &volumes(),
            &sweep(InputTarget::DiscountRate, 0.05, 0.15, 0.05),
            &sweep(
                InputTarget::Volume {
                    line: "widget".into(),
                },
                80.0,
                120.0,
                20.0,
            ),
        )
        .unwrap();
        assert!(warnings.is_empty());
        assert_eq!(grid.matrix.len(), 3);
        assert!(grid.matrix.iter().all(|row| row.len() == 3));
        assert_eq!(grid.base_case_position, (1, 1));
        assert_relative_eq!(
            grid.matrix[1][1].unwrap(),
            grid.base_case_npv,
            epsilon = 1e-9
        );
        // NPV falls with the rate and rises with volume
        assert!(grid.matrix[0][1] > grid.matrix[2][1]);
        assert!(grid.matrix[1][2] > grid.matrix[1][0]);
    }

    #[test]
    fn test_grid_invalid_cells_are_empty() {
        let (grid, warnings) = sensitivity_grid(
            &params(),
            &volumes(),
            &sweep(InputTarget::FixedCosts, -100.0, 100.0, 100.0),
            &sweep(InputTarget::DiscountRate, 0.1, 0.1, 0.1),
        )
        .unwrap();
        assert_eq!(grid.matrix[0][0], None);
        assert!(grid.matrix[1][0].is_some());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_analyze_sensitivity_requires_work() {
        let input = SensitivityInput {
            parameters: params(),
            volumes: volumes(),
            bumps: vec![],
            grid: None,
        };
        assert!(analyze_sensitivity(&input).is_err());
    }
}
