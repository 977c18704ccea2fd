use serde::{Deserialize, Serialize};
use tracing::trace;

use super::params::{
    DepreciationPolicy, SalesVolumes, ScenarioParameters, TaxLossPolicy, MAX_HORIZON,
};
use crate::types::{CashFlowSeries, Money, Period, Rate};
use crate::AppraisalResult;

/// Income-statement and cash-flow detail for one operating period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodDetail {
    pub period: Period,
    pub revenue: Money,
    pub variable_cost: Money,
    pub fixed_costs: Money,
    pub depreciation: Money,
    pub taxable_income: Money,
    pub taxes: Money,
    /// After-tax cash flow before any terminal recovery.
    pub operating_cash_flow: Money,
    /// Working capital and salvage recovered (final period only).
    pub terminal_recovery: Money,
    pub cash_flow: Money,
    pub closing_book_value: Money,
}

/// Cash-flow series together with its per-period breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub initial_outlay: Money,
    pub periods: Vec<PeriodDetail>,
    pub series: CashFlowSeries,
}

/// Revenue and variable cost per period, signed by each line's sales effect.
/// Callers validate `volumes` against the product lines first.
pub(crate) fn revenue_and_variable_cost(
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
) -> (Money, Money) {
    let mut revenue = 0.0;
    let mut variable_cost = 0.0;
    for line in &params.product_lines {
        let volume = volumes.get(&line.name).copied().unwrap_or(0.0);
        let sign = line.effect.sign();
        revenue += sign * line.unit_price * volume;
        variable_cost += sign * line.unit_variable_cost * volume;
    }
    (revenue, variable_cost)
}

/// Depreciation charge and closing book value for each period 1..=horizon.
///
/// A charge never exceeds the remaining book value, so book value floors at
/// zero whatever the policy parameters.
pub fn depreciation_schedule(
    capital_expenditure: Money,
    policy: DepreciationPolicy,
    horizon: usize,
) -> Vec<(Money, Money)> {
    let mut book_value = capital_expenditure;
    let mut schedule = Vec::with_capacity(horizon.min(MAX_HORIZON));
    for period in 1..=horizon {
        let charge = match policy {
            DepreciationPolicy::DecliningBalance { rate } => book_value * rate,
            DepreciationPolicy::StraightLine { life } => {
                let life = life.unwrap_or(horizon);
                if period <= life {
                    capital_expenditure / life as f64
                } else {
                    0.0
                }
            }
        };
        let charge = charge.min(book_value).max(0.0);
        book_value = (book_value - charge).max(0.0);
        schedule.push((charge, book_value));
    }
    schedule
}

fn taxes_on(taxable_income: Money, tax_rate: Rate, policy: TaxLossPolicy) -> Money {
    let taxes = taxable_income * tax_rate;
    match policy {
        TaxLossPolicy::Credit => taxes,
        TaxLossPolicy::NoCredit => taxes.max(0.0),
    }
}

/// Project the after-tax cash flows of a scenario with full period detail.
pub fn project_cash_flows(
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
) -> AppraisalResult<CashFlowProjection> {
    params.validate()?;
    params.validate_volumes(volumes)?;

    let (revenue, variable_cost) = revenue_and_variable_cost(params, volumes);
    let schedule = depreciation_schedule(
        params.capital_expenditure,
        params.depreciation,
        params.horizon,
    );

    let initial_outlay = params.initial_outlay();
    let mut flows = Vec::with_capacity(params.horizon + 1);
    flows.push(initial_outlay);
    let mut periods = Vec::with_capacity(params.horizon);

    for (idx, (depreciation, closing_book_value)) in schedule.into_iter().enumerate() {
        let period = idx + 1;
        let taxable_income = revenue - variable_cost - params.fixed_costs - depreciation;
        let taxes = taxes_on(taxable_income, params.tax_rate, params.tax_losses);
        let operating_cash_flow =
            revenue - variable_cost - params.fixed_costs - taxes + depreciation;

        let terminal_recovery = if period == params.horizon {
            let disposal = params.salvage_value.map_or(0.0, |salvage| {
                salvage - params.tax_rate * (salvage - closing_book_value)
            });
            params.working_capital + disposal
        } else {
            0.0
        };

        let cash_flow = operating_cash_flow + terminal_recovery;
        flows.push(cash_flow);
        periods.push(PeriodDetail {
            period,
            revenue,
            variable_cost,
            fixed_costs: params.fixed_costs,
            depreciation,
            taxable_income,
            taxes,
            operating_cash_flow,
            terminal_recovery,
            cash_flow,
            closing_book_value,
        });
    }

    trace!(horizon = params.horizon, initial_outlay, "projected cash flows");

    Ok(CashFlowProjection {
        initial_outlay,
        periods,
        series: CashFlowSeries::new(flows)?,
    })
}

/// Build the period 0..N cash-flow series of a scenario.
pub fn build_cash_flows(
    params: &ScenarioParameters,
    volumes: &SalesVolumes,
) -> AppraisalResult<CashFlowSeries> {
    project_cash_flows(params, volumes).map(|p| p.series)
}
