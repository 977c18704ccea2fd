use crate::error::AppraisalError;
use crate::time_value::validate_rate;
use crate::types::{CashFlowSeries, Rate};
use crate::AppraisalResult;

/// Modified IRR with a single rate for financing and reinvestment.
pub fn mirr(series: &CashFlowSeries, rate: Rate) -> AppraisalResult<Rate> {
    mirr_with_rates(series, rate, rate)
}

/// Modified IRR.
///
/// Negative flows are discounted to period 0 at `finance_rate`; positive
/// flows are compounded to period N at `reinvest_rate`. Fails with
/// `DivisionUndefined` when the series has no negative flow or no period
/// after period 0.
pub fn mirr_with_rates(
    series: &CashFlowSeries,
    finance_rate: Rate,
    reinvest_rate: Rate,
) -> AppraisalResult<Rate> {
    validate_rate(finance_rate, "finance_rate")?;
    validate_rate(reinvest_rate, "reinvest_rate")?;

    let n = series.horizon();
    if n == 0 {
        return Err(AppraisalError::DivisionUndefined {
            context: "MIRR over zero periods".into(),
        });
    }
    let n_i32 =
        i32::try_from(n).map_err(|_| AppraisalError::invalid("series", "Too many periods"))?;

    let mut fv_positive = 0.0;
    let mut pv_negative = 0.0;
    for (t, &cf) in series.flows().iter().enumerate() {
        // t <= n fits in i32 once n does
        let t = t as i32;
        if cf > 0.0 {
            fv_positive += cf * (1.0 + reinvest_rate).powi(n_i32 - t);
        } else if cf < 0.0 {
            pv_negative += cf / (1.0 + finance_rate).powi(t);
        }
    }

    if pv_negative == 0.0 {
        return Err(AppraisalError::DivisionUndefined {
            context: "MIRR present value of negative cash flows is zero".into(),
        });
    }

    Ok((fv_positive / -pv_negative).powf(1.0 / n as f64) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mirr_unconventional_project() {
        let mut flows = vec![-99.0];
        flows.extend([12.0; 20]);
        flows.push(-141.0);
        let s = CashFlowSeries::new(flows).unwrap();
        assert_relative_eq!(mirr(&s, 0.12).unwrap(), 0.1081576597, epsilon = 1e-9);
    }

    #[test]
    fn test_mirr_equals_irr_for_single_period() {
        let s = CashFlowSeries::new(vec![-100.0, 110.0]).unwrap();
        assert_relative_eq!(mirr(&s, 0.05).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_mirr_without_negative_flows_is_division_undefined() {
        let s = CashFlowSeries::new(vec![0.0, 10.0, 20.0]).unwrap();
        assert!(matches!(
            mirr(&s, 0.1),
            Err(AppraisalError::DivisionUndefined { .. })
        ));
    }

    #[test]
    fn test_mirr_degenerate_series_is_division_undefined() {
        let s = CashFlowSeries::new(vec![-10.0]).unwrap();
        assert!(matches!(
            mirr(&s, 0.1),
            Err(AppraisalError::DivisionUndefined { .. })
        ));
    }

    #[test]
    fn test_mirr_separate_rates() {
        // FV+ = 60*1.1 + 60 = 126, PV- = 100 → sqrt(1.26) - 1
        let s = CashFlowSeries::new(vec![-100.0, 60.0, 60.0]).unwrap();
        assert_relative_eq!(
            mirr_with_rates(&s, 0.05, 0.10).unwrap(),
            1.26_f64.sqrt() - 1.0,
            epsilon = 1e-12
        );
    }
}
