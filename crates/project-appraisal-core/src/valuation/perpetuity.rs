use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::irr::irr;
use super::payback::{discounted_payback_period, payback_period};
use crate::cash_flow::MAX_HORIZON;
use crate::error::AppraisalError;
use crate::time_value::{growing_perpetuity_pv, npv, perpetuity_crossover_rate, perpetuity_pv};
use crate::types::{
    with_metadata, CashFlowSeries, ComputationOutput, Metric, Money, Period, Rate, UndefinedReason,
};
use crate::AppraisalResult;

/// A perpetuity whose first flow grows at a constant rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrowingStream {
    pub cash_flow: Money,
    pub growth: Rate,
}

fn default_horizon() -> usize {
    100
}

/// Compare a level perpetuity with an optional growing one, both bought
/// for the same initial investment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpetuityInput {
    /// Amount paid at period 0, as a positive number.
    pub initial_investment: Money,
    pub rate: Rate,
    pub level_cash_flow: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growing: Option<GrowingStream>,
    /// Periods of each stream used for payback and IRR.
    #[serde(default = "default_horizon")]
    pub horizon: usize,
}

/// Payback and IRR of a stream cut off after a finite number of periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetrics {
    /// NPV of the truncated stream at the input rate.
    pub npv: Money,
    pub payback_period: Metric<Period>,
    pub discounted_payback_period: Metric<Period>,
    pub irr: Metric<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerpetuityOutput {
    pub level_pv: Money,
    pub level_npv: Money,
    pub growing_pv: Option<Money>,
    pub growing_npv: Option<Money>,
    /// Rate at which both streams are worth the same.
    pub crossover_rate: Option<Rate>,
    pub level_stream: StreamMetrics,
    pub growing_stream: Option<StreamMetrics>,
}

fn stream_metrics(series: &CashFlowSeries, rate: Rate) -> AppraisalResult<StreamMetrics> {
    Ok(StreamMetrics {
        npv: npv(series, rate)?,
        payback_period: Metric::from_option(payback_period(series), UndefinedReason::NotRecovered),
        discounted_payback_period: Metric::from_option(
            discounted_payback_period(series, rate)?,
            UndefinedReason::NotRecovered,
        ),
        irr: irr(series).rate,
    })
}

pub fn appraise_perpetuities(
    input: &PerpetuityInput,
) -> AppraisalResult<ComputationOutput<PerpetuityOutput>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if !input.initial_investment.is_finite() || input.initial_investment < 0.0 {
        return Err(AppraisalError::invalid(
            "initial_investment",
            "Must be a finite non-negative amount",
        ));
    }
    if input.horizon < 1 || input.horizon > MAX_HORIZON {
        return Err(AppraisalError::invalid(
            "horizon",
            format!("Must be between 1 and {MAX_HORIZON} periods"),
        ));
    }

    let level_pv = perpetuity_pv(input.level_cash_flow, input.rate)?;
    let level_npv = level_pv - input.initial_investment;
    let level_series =
        CashFlowSeries::level(-input.initial_investment, input.level_cash_flow, input.horizon)?;
    let level_stream = stream_metrics(&level_series, input.rate)?;

    let (growing_pv, crossover_rate, growing_stream) = match input.growing {
        Some(g) => {
            let pv = growing_perpetuity_pv(g.cash_flow, input.rate, g.growth)?;
            let crossover =
                match perpetuity_crossover_rate(input.level_cash_flow, g.cash_flow, g.growth) {
                    Ok(k) => k,
                    Err(AppraisalError::DivisionUndefined { context }) => {
                        warnings.push(format!("No crossover rate: {context}"));
                        None
                    }
                    Err(e) => return Err(e),
                };
            let series = CashFlowSeries::growing(
                -input.initial_investment,
                g.cash_flow,
                g.growth,
                input.horizon,
            )?;
            (Some(pv), crossover, Some(stream_metrics(&series, input.rate)?))
        }
        None => (None, None, None),
    };
    let growing_npv = growing_pv.map(|pv| pv - input.initial_investment);

    if let (Some(k), Some(g)) = (crossover_rate, growing_npv) {
        let better = if g > level_npv { "growing" } else { "level" };
        warnings.push(format!(
            "The {better} stream is preferred at {:.2}%; preference flips at {:.2}%",
            input.rate * 100.0,
            k * 100.0
        ));
    }
    for (name, stream) in std::iter::once(("level", &level_stream))
        .chain(growing_stream.as_ref().map(|s| ("growing", s)))
    {
        if stream.payback_period.reason().is_some() {
            warnings.push(format!(
                "The {name} stream does not recover the investment within {} periods",
                input.horizon
            ));
        }
    }

    let output = PerpetuityOutput {
        level_pv,
        level_npv,
        growing_pv,
        growing_npv,
        crossover_rate,
        level_stream,
        growing_stream,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Level perpetuity C/r and growing perpetuity C/(r - g); payback and IRR over the horizon",
        input,
        warnings,
        elapsed,
        output,
    ))
}
