use crate::time_value::validate_rate;
use crate::types::{CashFlowSeries, Money, Period, Rate};
use crate::AppraisalResult;

fn first_recovery(flows: impl Iterator<Item = Money>) -> Option<Period> {
    let mut cumulative = 0.0;
    for (t, cf) in flows.enumerate() {
        cumulative += cf;
        if cumulative >= 0.0 {
            return Some(t);
        }
    }
    None
}

/// Smallest period t at which the cumulative cash flow of periods 0..=t is
/// non-negative. `None` if the outlay is never recovered.
pub fn payback_period(series: &CashFlowSeries) -> Option<Period> {
    first_recovery(series.flows().iter().copied())
}

/// Payback period on flows discounted at `rate`.
pub fn discounted_payback_period(
    series: &CashFlowSeries,
    rate: Rate,
) -> AppraisalResult<Option<Period>> {
    validate_rate(rate, "rate")?;
    let one_plus_r = 1.0 + rate;
    let discounted = series.flows().iter().scan(1.0, |discount, cf| {
        let pv = cf / *discount;
        *discount *= one_plus_r;
        Some(pv)
    });
    Ok(first_recovery(discounted))
}

/// Payback in fractional periods, assuming the recovering period's flow
/// arrives evenly through that period.
pub fn fractional_payback(series: &CashFlowSeries) -> Option<f64> {
    let t = payback_period(series)?;
    if t == 0 {
        return Some(0.0);
    }
    let cumulative = series.cumulative();
    let shortfall = -cumulative[t - 1];
    let flow = series.flows()[t];
    let fraction = if flow > 0.0 { shortfall / flow } else { 1.0 };
    Some((t - 1) as f64 + fraction)
}
