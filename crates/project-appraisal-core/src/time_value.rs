use crate::error::AppraisalError;
use crate::types::{CashFlowSeries, Money, Rate};
use crate::AppraisalResult;

/// Reject discount rates at or below -100% (and non-finite rates).
pub(crate) fn validate_rate(rate: Rate, field: &str) -> AppraisalResult<()> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(AppraisalError::invalid(
            field,
            "Discount rate must be finite and greater than -100%",
        ));
    }
    Ok(())
}

fn periods_exponent(periods: usize) -> AppraisalResult<i32> {
    i32::try_from(periods).map_err(|_| AppraisalError::invalid("periods", "Too many periods"))
}

/// NPV of raw flows without validation. Uses an iterative discount factor.
pub(crate) fn npv_flows(rate: Rate, flows: &[Money]) -> Money {
    let one_plus_r = 1.0 + rate;
    let mut discount = 1.0;
    let mut result = 0.0;
    for (t, cf) in flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        result += cf / discount;
    }
    result
}

/// Net Present Value of the whole series, period 0 undiscounted.
pub fn npv(series: &CashFlowSeries, rate: Rate) -> AppraisalResult<Money> {
    validate_rate(rate, "rate")?;
    Ok(npv_flows(rate, series.flows()))
}

/// Present value of periods 1..N discounted one period at a time.
pub fn direct_pv(series: &CashFlowSeries, rate: Rate) -> AppraisalResult<Money> {
    validate_rate(rate, "rate")?;
    let one_plus_r = 1.0 + rate;
    let mut discount = 1.0;
    let mut pv = 0.0;
    for cf in series.operating() {
        discount *= one_plus_r;
        pv += cf / discount;
    }
    Ok(pv)
}

/// Present value of periods 1..N.
///
/// Level flows go through the closed-form annuity factor; anything else is
/// summed period by period. Both paths agree to floating-point precision.
pub fn discount_pv(series: &CashFlowSeries, rate: Rate) -> AppraisalResult<Money> {
    if series.is_level() {
        annuity_pv(series.operating()[0], rate, series.horizon())
    } else {
        direct_pv(series, rate)
    }
}

/// Present value of `periods` level payments of `cash_flow`, first one
/// received at the end of period 1.
pub fn annuity_pv(cash_flow: Money, rate: Rate, periods: usize) -> AppraisalResult<Money> {
    validate_rate(rate, "rate")?;
    if rate == 0.0 {
        return Ok(cash_flow * periods as f64);
    }
    let n = f64::from(periods_exponent(periods)?);
    // 1 - (1 + r)^-n without cancellation for small r
    let factor = -(-n * rate.ln_1p()).exp_m1();
    Ok(cash_flow * factor / rate)
}

/// Present value of a level perpetuity: `cash_flow / rate`.
pub fn perpetuity_pv(cash_flow: Money, rate: Rate) -> AppraisalResult<Money> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(AppraisalError::invalid(
            "rate",
            "Perpetuity requires a positive discount rate",
        ));
    }
    Ok(cash_flow / rate)
}

/// Present value of a perpetuity whose first flow `cash_flow` grows at
/// `growth` per period (Gordon growth).
pub fn growing_perpetuity_pv(cash_flow: Money, rate: Rate, growth: Rate) -> AppraisalResult<Money> {
    validate_rate(rate, "rate")?;
    if !growth.is_finite() || rate <= growth {
        return Err(AppraisalError::invalid(
            "growth",
            "Discount rate must exceed the growth rate",
        ));
    }
    Ok(cash_flow / (rate - growth))
}

/// Discount rate at which a level perpetuity of `level_cash_flow` and a
/// perpetuity starting at `growing_cash_flow` and growing at `growth` have
/// the same present value.
///
/// Below the crossover the growing stream is worth more. Returns `None` when
/// the two never cross at a rate above `growth`.
pub fn perpetuity_crossover_rate(
    level_cash_flow: Money,
    growing_cash_flow: Money,
    growth: Rate,
) -> AppraisalResult<Option<Rate>> {
    let gap = level_cash_flow - growing_cash_flow;
    if gap == 0.0 {
        return Err(AppraisalError::DivisionUndefined {
            context: "perpetuity crossover (equal first-period cash flows)".into(),
        });
    }
    let k = level_cash_flow * growth / gap;
    if k > growth && k > 0.0 {
        Ok(Some(k))
    } else {
        Ok(None)
    }
}
