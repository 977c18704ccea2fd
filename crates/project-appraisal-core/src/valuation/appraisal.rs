use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use super::irr::irr;
use super::mirr::mirr_with_rates;
use super::payback::{discounted_payback_period, fractional_payback, payback_period};
use crate::cash_flow::{project_cash_flows, CashFlowProjection, SalesVolumes, ScenarioParameters};
use crate::error::AppraisalError;
use crate::time_value::{discount_pv, npv};
use crate::types::{
    with_metadata, CashFlowSeries, ComputationOutput, Metric, Money, Period, Rate, UndefinedReason,
};
use crate::AppraisalResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Non-fatal observations attached to a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// The series changes sign more than once, so IRR may have several values.
    AmbiguousRoot { sign_changes: usize },
}

/// Every decision metric for one cash-flow series at one discount rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub npv: Money,
    pub irr: Metric<Rate>,
    pub mirr: Metric<Rate>,
    pub payback_period: Metric<Period>,
    pub discounted_payback_period: Metric<Period>,
    pub sign_changes: usize,
    pub advisories: Vec<Advisory>,
}

impl ValuationResult {
    pub fn has_ambiguous_root(&self) -> bool {
        self.advisories
            .iter()
            .any(|a| matches!(a, Advisory::AmbiguousRoot { .. }))
    }
}

/// A scenario to project and value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraisalInput {
    pub parameters: ScenarioParameters,
    pub volumes: SalesVolumes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppraisalOutput {
    pub projection: CashFlowProjection,
    pub valuation: ValuationResult,
    /// Present value of periods 1..N at the cost of capital.
    pub operating_pv: Money,
    pub fractional_payback: Option<f64>,
    /// Every IRR located in the search domain.
    pub irr_roots: Vec<Rate>,
}

/// An explicit cash-flow series to value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInput {
    pub flows: CashFlowSeries,
    pub rate: Rate,
    /// MIRR financing rate. Defaults to `rate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance_rate: Option<Rate>,
    /// MIRR reinvestment rate. Defaults to `rate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reinvest_rate: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOutput {
    pub valuation: ValuationResult,
    pub operating_pv: Money,
    pub fractional_payback: Option<f64>,
    pub irr_roots: Vec<Rate>,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

fn mirr_metric(
    series: &CashFlowSeries,
    finance: Rate,
    reinvest: Rate,
) -> AppraisalResult<Metric<Rate>> {
    match mirr_with_rates(series, finance, reinvest) {
        Ok(value) => Ok(Metric::defined(value)),
        Err(AppraisalError::DivisionUndefined { .. }) => {
            Ok(Metric::undefined(UndefinedReason::DivisionUndefined))
        }
        Err(e) => Err(e),
    }
}

fn evaluate_with_rates(
    series: &CashFlowSeries,
    rate: Rate,
    finance_rate: Rate,
    reinvest_rate: Rate,
) -> AppraisalResult<(ValuationResult, Vec<Rate>)> {
    let npv = npv(series, rate)?;
    let irr = irr(series);
    let mirr = mirr_metric(series, finance_rate, reinvest_rate)?;
    let payback = Metric::from_option(payback_period(series), UndefinedReason::NotRecovered);
    let discounted = Metric::from_option(
        discounted_payback_period(series, rate)?,
        UndefinedReason::NotRecovered,
    );

    let mut advisories = Vec::new();
    if irr.ambiguous_root {
        advisories.push(Advisory::AmbiguousRoot {
            sign_changes: irr.sign_changes,
        });
    }

    Ok((
        ValuationResult {
            npv,
            irr: irr.rate,
            mirr,
            payback_period: payback,
            discounted_payback_period: discounted,
            sign_changes: irr.sign_changes,
            advisories,
        },
        irr.roots,
    ))
}

/// Value a series at `rate`: NPV, IRR, MIRR (financing and reinvestment at
/// `rate`), simple and discounted payback.
///
/// Fails only on an invalid rate. A metric with no solution is reported as
/// `Metric::Undefined`.
pub fn evaluate(series: &CashFlowSeries, rate: Rate) -> AppraisalResult<ValuationResult> {
    evaluate_with_rates(series, rate, rate, rate).map(|(result, _)| result)
}

fn collect_warnings(valuation: &ValuationResult, warnings: &mut Vec<String>) {
    for advisory in &valuation.advisories {
        match advisory {
            Advisory::AmbiguousRoot { sign_changes } => warnings.push(format!(
                "Cash flows change sign {sign_changes} times; IRR may not be unique, use NPV"
            )),
        }
    }
    if let Some(reason) = valuation.irr.reason() {
        warn!(%reason, "IRR undefined");
        warnings.push(format!("IRR undefined: {reason}"));
    }
    if let Some(reason) = valuation.mirr.reason() {
        warnings.push(format!("MIRR undefined: {reason}"));
    }
    if valuation.payback_period.reason().is_some() {
        warnings.push("Initial outlay is not recovered within the horizon".into());
    }
    if valuation.npv < 0.0 {
        warnings.push(format!(
            "NPV is negative ({:.2}): project destroys value at this discount rate",
            valuation.npv
        ));
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Project a scenario's cash flows and value them at its cost of capital.
pub fn appraise_project(
    input: &AppraisalInput,
) -> AppraisalResult<ComputationOutput<AppraisalOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let projection = project_cash_flows(&input.parameters, &input.volumes)?;
    let rate = input.parameters.discount_rate;
    let (valuation, irr_roots) = evaluate_with_rates(&projection.series, rate, rate, rate)?;
    let operating_pv = discount_pv(&projection.series, rate)?;
    let fractional = fractional_payback(&projection.series);

    collect_warnings(&valuation, &mut warnings);

    let output = AppraisalOutput {
        projection,
        valuation,
        operating_pv,
        fractional_payback: fractional,
        irr_roots,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Incremental after-tax cash flows discounted at the cost of capital",
        &serde_json::json!({
            "discount_rate": rate,
            "horizon": input.parameters.horizon,
            "depreciation": input.parameters.depreciation,
            "tax_rate": input.parameters.tax_rate,
            "tax_losses": input.parameters.tax_losses,
            "irr_domain": [super::irr::IRR_LOWER_BOUND, super::irr::IRR_UPPER_BOUND],
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Project a scenario's period-by-period cash flows without valuing them.
pub fn project_scenario(
    input: &AppraisalInput,
) -> AppraisalResult<ComputationOutput<CashFlowProjection>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let projection = project_cash_flows(&input.parameters, &input.volumes)?;
    let losses = projection.periods.iter().filter(|d| d.taxable_income < 0.0).count();
    if losses > 0 {
        warnings.push(format!(
            "{losses} period(s) report a taxable loss; tax treated as {:?}",
            input.parameters.tax_losses
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Incremental after-tax cash flows: revenue less costs and taxes, plus depreciation",
        &serde_json::json!({
            "horizon": input.parameters.horizon,
            "depreciation": input.parameters.depreciation,
            "tax_rate": input.parameters.tax_rate,
            "tax_losses": input.parameters.tax_losses,
            "working_capital": input.parameters.working_capital,
            "salvage_value": input.parameters.salvage_value,
        }),
        warnings,
        elapsed,
        projection,
    ))
}

/// Value an explicit cash-flow series.
pub fn value_cash_flows(input: &SeriesInput) -> AppraisalResult<ComputationOutput<SeriesOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    let finance = input.finance_rate.unwrap_or(input.rate);
    let reinvest = input.reinvest_rate.unwrap_or(input.rate);
    let (valuation, irr_roots) = evaluate_with_rates(&input.flows, input.rate, finance, reinvest)?;
    let operating_pv = discount_pv(&input.flows, input.rate)?;

    collect_warnings(&valuation, &mut warnings);

    let output = SeriesOutput {
        fractional_payback: fractional_payback(&input.flows),
        valuation,
        operating_pv,
        irr_roots,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discounted cash-flow metrics of an explicit series",
        &serde_json::json!({
            "rate": input.rate,
            "finance_rate": finance,
            "reinvest_rate": reinvest,
            "periods": input.flows.horizon(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
