use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppraisalError;
use crate::time_value::npv_flows;
use crate::types::{CashFlowSeries, Metric, Money, Rate, UndefinedReason};
use crate::AppraisalResult;

/// Lower end of the IRR search domain.
pub const IRR_LOWER_BOUND: Rate = -0.99;
/// Upper end of the IRR search domain.
pub const IRR_UPPER_BOUND: Rate = 10.0;

const MAX_IRR_ITERATIONS: u32 = 100;
const RATE_TOLERANCE: f64 = 1e-12;
const NEWTON_GUESS: Rate = 0.10;

/// IRR together with everything the caller needs to judge it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrOutcome {
    /// Smallest-magnitude root in the search domain.
    pub rate: Metric<Rate>,
    /// Every root located in the search domain, ascending.
    pub roots: Vec<Rate>,
    pub sign_changes: usize,
    /// Two or more sign changes: the series may have several IRRs.
    pub ambiguous_root: bool,
}

/// NPV and dNPV/dr at `rate`.
fn npv_and_derivative(flows: &[Money], rate: Rate) -> (f64, f64) {
    let one_plus_r = 1.0 + rate;
    let mut discount = 1.0;
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for (t, cf) in flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
            dnpv -= t as f64 * cf / (discount * one_plus_r);
        }
        npv += cf / discount;
    }
    (npv, dnpv)
}

/// Scan points: 1% steps up to 100%, then 10% steps to the upper bound.
fn scan_grid() -> Vec<Rate> {
    let fine = (0..=199).map(|i| (f64::from(i) - 99.0) / 100.0);
    let coarse = (1..=90).map(|j| (10.0 + f64::from(j)) / 10.0);
    fine.chain(coarse).collect()
}

/// Safeguarded Newton-Raphson inside a sign-change bracket.
///
/// Takes a Newton step when it stays inside the bracket and shrinks fast
/// enough, otherwise bisects. The bracket always contains the root.
fn solve_bracketed(
    flows: &[Money],
    lo: Rate,
    hi: Rate,
    f_lo: f64,
    f_hi: f64,
    scale: f64,
) -> AppraisalResult<Rate> {
    let (mut neg, mut pos) = if f_lo < 0.0 { (lo, hi) } else { (hi, lo) };
    debug_assert!(f_lo * f_hi < 0.0);

    let mut rate = 0.5 * (lo + hi);
    let mut dx_old = (hi - lo).abs();
    let mut dx = dx_old;
    let (mut f, mut df) = npv_and_derivative(flows, rate);

    for _ in 0..MAX_IRR_ITERATIONS {
        let newton_leaves_bracket = ((rate - pos) * df - f) * ((rate - neg) * df - f) > 0.0;
        let newton_too_slow = (2.0 * f).abs() > (dx_old * df).abs();
        if newton_leaves_bracket || newton_too_slow || df == 0.0 {
            dx_old = dx;
            dx = 0.5 * (pos - neg);
            rate = neg + dx;
        } else {
            dx_old = dx;
            dx = f / df;
            rate -= dx;
        }

        if dx.abs() < RATE_TOLERANCE {
            return Ok(rate);
        }

        (f, df) = npv_and_derivative(flows, rate);
        if f.abs() <= f64::EPSILON * scale {
            return Ok(rate);
        }
        if f < 0.0 {
            neg = rate;
        } else {
            pos = rate;
        }
    }

    Err(AppraisalError::NoConvergence {
        function: "IRR".into(),
        iterations: MAX_IRR_ITERATIONS,
        last_delta: f,
    })
}

/// Zero of dNPV/dr inside `(lo, hi)`, if the derivative changes sign there.
fn turning_point(flows: &[Money], lo: Rate, hi: Rate) -> Option<Rate> {
    let (_, mut d_lo) = npv_and_derivative(flows, lo);
    let (_, d_hi) = npv_and_derivative(flows, hi);
    if d_lo.is_nan() || d_hi.is_nan() || d_lo * d_hi >= 0.0 {
        return None;
    }
    let (mut a, mut b) = (lo, hi);
    for _ in 0..MAX_IRR_ITERATIONS {
        let mid = 0.5 * (a + b);
        let (_, d_mid) = npv_and_derivative(flows, mid);
        if d_mid == 0.0 {
            return Some(mid);
        }
        if d_mid * d_lo < 0.0 {
            b = mid;
        } else {
            a = mid;
            d_lo = d_mid;
        }
        if b - a < RATE_TOLERANCE {
            break;
        }
    }
    Some(0.5 * (a + b))
}

/// Plain Newton-Raphson from a fixed guess, clamped to the search domain.
/// Only used when the scan found no sign change, to catch tangent roots.
fn solve_unbracketed(flows: &[Money], scale: f64) -> Option<Rate> {
    let mut rate = NEWTON_GUESS;
    for _ in 0..MAX_IRR_ITERATIONS {
        let (f, df) = npv_and_derivative(flows, rate);
        if f.abs() <= 1e-10 * scale {
            return Some(rate);
        }
        if df == 0.0 || !df.is_finite() {
            return None;
        }
        rate = (rate - f / df).clamp(IRR_LOWER_BOUND, IRR_UPPER_BOUND);
    }
    None
}

/// Internal Rate of Return.
///
/// Scans (-0.99, 10.0) for exact zeros and sign changes of NPV, refines
/// every bracket, and reports the root closest to zero. Series with two or
/// more sign changes are flagged as ambiguous.
pub fn irr(series: &CashFlowSeries) -> IrrOutcome {
    let flows = series.flows();
    let sign_changes = series.sign_changes();
    let ambiguous_root = sign_changes >= 2;

    let undefined = |reason| IrrOutcome {
        rate: Metric::undefined(reason),
        roots: Vec::new(),
        sign_changes,
        ambiguous_root,
    };

    if flows.len() < 2 || sign_changes == 0 {
        return undefined(UndefinedReason::NoRealRoot);
    }

    let scale: f64 = flows.iter().map(|cf| cf.abs()).sum();
    let grid = scan_grid();
    let values: Vec<f64> = grid.iter().map(|r| npv_flows(*r, flows)).collect();

    let mut roots = Vec::new();
    let mut brackets = Vec::new();
    for (i, (&r, &f)) in grid.iter().zip(values.iter()).enumerate() {
        if !f.is_finite() {
            continue;
        }
        if f == 0.0 {
            roots.push(r);
            continue;
        }
        let Some((&r_next, &f_next)) = grid.get(i + 1).zip(values.get(i + 1)) else {
            continue;
        };
        if !f_next.is_finite() {
            continue;
        }
        if f * f_next < 0.0 {
            brackets.push((r, r_next, f, f_next));
        } else if ambiguous_root && f * f_next > 0.0 {
            // Two roots inside one cell leave the endpoints on the same side;
            // split the cell at the NPV extremum between them.
            let Some(tp) = turning_point(flows, r, r_next) else {
                continue;
            };
            let f_tp = npv_flows(tp, flows);
            if f_tp == 0.0 {
                roots.push(tp);
            } else if f_tp * f < 0.0 {
                brackets.push((r, tp, f, f_tp));
                brackets.push((tp, r_next, f_tp, f_next));
            }
        }
    }

    let mut failures = 0_u32;
    for (lo, hi, f_lo, f_hi) in brackets {
        match solve_bracketed(flows, lo, hi, f_lo, f_hi, scale) {
            Ok(root) => roots.push(root),
            Err(e) => {
                debug!(lo, hi, error = %e, "IRR bracket did not converge");
                failures += 1;
            }
        }
    }

    if roots.is_empty() && failures == 0 {
        if let Some(root) = solve_unbracketed(flows, scale) {
            roots.push(root);
        }
    }

    roots.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    roots.dedup_by(|a, b| (*a - *b).abs() < 1e-9);

    let Some(best) = roots
        .iter()
        .copied()
        .min_by(|a, b| a.abs().partial_cmp(&b.abs()).unwrap_or(std::cmp::Ordering::Equal))
    else {
        let reason = if failures > 0 {
            UndefinedReason::NoConvergence
        } else {
            UndefinedReason::NoRealRoot
        };
        return undefined(reason);
    };

    if ambiguous_root {
        warn!(
            sign_changes,
            roots = roots.len(),
            chosen = best,
            "cash flows change sign more than once; IRR may not be unique"
        );
    }

    IrrOutcome {
        rate: Metric::defined(best),
        roots,
        sign_changes,
        ambiguous_root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(flows: &[f64]) -> CashFlowSeries {
        CashFlowSeries::new(flows.to_vec()).unwrap()
    }

    #[test]
    fn test_irr_basic() {
        let out = irr(&series(&[-1000.0, 400.0, 400.0, 400.0]));
        let r = out.rate.value().unwrap();
        assert_relative_eq!(r, 0.0970102574, epsilon = 1e-8);
        assert!(npv_flows(r, &[-1000.0, 400.0, 400.0, 400.0]).abs() < 1e-6);
        assert!(!out.ambiguous_root);
        assert_eq!(out.roots.len(), 1);
    }

    #[test]
    fn test_irr_negative_rate() {
        // Never recovers the outlay: IRR below zero
        let flows = [-100.0, 30.0, 30.0, 30.0];
        let r = irr(&series(&flows)).rate.value().unwrap();
        assert!(r < 0.0);
        assert!(npv_flows(r, &flows).abs() < 1e-6);
    }

    #[test]
    fn test_irr_two_roots_picks_smallest_magnitude() {
        let mut flows = vec![-99.0];
        flows.extend([12.0; 20]);
        flows.push(-141.0);
        let out = irr(&series(&flows));
        assert!(out.ambiguous_root);
        assert_eq!(out.sign_changes, 2);
        assert_eq!(out.roots.len(), 2);
        assert_eq!(out.rate.value(), Some(0.0));
        assert_relative_eq!(out.roots[1], 0.0497478117, epsilon = 1e-8);
    }

    #[test]
    fn test_irr_two_roots_in_one_scan_cell() {
        // NPV * (1+r)^3 = -1000 (x - 1.101)(x - 1.104)(x - 1.5), x = 1 + r
        let flows = [-1000.0, 3705.0, -4523.004, 1823.256];
        let out = irr(&series(&flows));
        assert!(out.ambiguous_root);
        assert_eq!(out.roots.len(), 3);
        for (root, expected) in out.roots.iter().zip([0.101, 0.104, 0.5]) {
            assert_relative_eq!(*root, expected, epsilon = 1e-9);
            assert!(npv_flows(*root, &flows).abs() < 1e-9);
        }
        assert_relative_eq!(out.rate.value().unwrap(), 0.101, epsilon = 1e-9);
    }

    #[test]
    fn test_turning_point_needs_derivative_sign_change() {
        let flows = [-1000.0, 3705.0, -4523.004, 1823.256];
        let tp = turning_point(&flows, 0.10, 0.11).unwrap();
        assert!(tp > 0.101 && tp < 0.104);
        assert!(turning_point(&[-1000.0, 400.0, 400.0, 400.0], 0.0, 0.5).is_none());
    }

    #[test]
    fn test_irr_no_sign_change_is_undefined() {
        let out = irr(&series(&[100.0, 10.0, 10.0]));
        assert_eq!(out.rate.reason(), Some(UndefinedReason::NoRealRoot));
    }

    #[test]
    fn test_irr_single_flow_is_undefined() {
        let out = irr(&series(&[-100.0]));
        assert!(!out.rate.is_defined());
    }

    #[test]
    fn test_irr_no_root_despite_sign_changes() {
        // NPV(r) = -1 + 3/(1+r) - 3/(1+r)^2 stays negative everywhere
        let out = irr(&series(&[-1.0, 3.0, -3.0]));
        assert!(out.ambiguous_root);
        assert_eq!(out.rate.reason(), Some(UndefinedReason::NoRealRoot));
    }

    #[test]
    fn test_scan_grid_contains_zero_and_bounds() {
        let grid = scan_grid();
        assert_eq!(grid.first().copied(), Some(IRR_LOWER_BOUND));
        assert_eq!(grid.last().copied(), Some(IRR_UPPER_BOUND));
        assert!(grid.contains(&0.0));
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }
}
