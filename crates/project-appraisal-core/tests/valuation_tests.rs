use approx::assert_relative_eq;
use project_appraisal_core::time_value::{
    annuity_pv, direct_pv, discount_pv, growing_perpetuity_pv, npv, perpetuity_crossover_rate,
    perpetuity_pv,
};
use project_appraisal_core::valuation::{
    evaluate, irr, mirr, payback_period, Advisory, PerpetuityInput,
};
use project_appraisal_core::{AppraisalError, CashFlowSeries, UndefinedReason};
use proptest::prelude::*;

// ===========================================================================
// Closed-form vs direct discounting
// ===========================================================================

proptest! {
    #[test]
    fn annuity_matches_direct_sum(
        periods in 1usize..=50,
        rate in 0.0001f64..0.9999,
        cash_flow in 1.0f64..1_000_000.0,
    ) {
        let s = CashFlowSeries::level(-cash_flow, cash_flow, periods).unwrap();
        let closed = discount_pv(&s, rate).unwrap();
        let direct = direct_pv(&s, rate).unwrap();
        prop_assert!(((closed - direct) / direct).abs() < 1e-9, "closed={closed} direct={direct}");
    }

    #[test]
    fn conventional_irr_zeroes_npv(
        outlay in 100.0f64..10_000.0,
        multiple in 0.2f64..3.0,
        periods in 2usize..=30,
    ) {
        let cf = outlay * multiple / periods as f64 * 2.0;
        let s = CashFlowSeries::level(-outlay, cf, periods).unwrap();
        let out = irr(&s);
        let r = out.rate.value().unwrap();
        prop_assert!(npv(&s, r).unwrap().abs() < 1e-6);
        prop_assert!(!out.ambiguous_root);
    }
}

#[test]
fn test_annuity_at_zero_rate() {
    assert_eq!(annuity_pv(12.0, 0.0, 20).unwrap(), 240.0);
}

// ===========================================================================
// Unconventional project: outlay, level inflows, shutdown cost
// ===========================================================================

fn shutdown_project() -> CashFlowSeries {
    CashFlowSeries::level(-99.0, 12.0, 20)
        .unwrap()
        .with_terminal_flow(-141.0)
}

#[test]
fn test_shutdown_project_npv_and_sign_changes() {
    let s = shutdown_project();
    assert_eq!(s.len(), 22);
    assert_eq!(s.sign_changes(), 2);
    // -99 + 12 * a(20, 12%) - 141 / 1.12^21
    assert_relative_eq!(npv(&s, 0.12).unwrap(), -22.4176, epsilon = 1e-4);

    // Shutdown paid in period 20 rather than after it
    let same_period = CashFlowSeries::level(-99.0, 12.0, 20)
        .unwrap()
        .with_terminal_adjustment(-141.0);
    assert_eq!(same_period.sign_changes(), 2);
    assert_relative_eq!(npv(&same_period, 0.12).unwrap(), -23.9837, epsilon = 1e-4);
}

#[test]
fn test_shutdown_project_irr_is_bracketed_and_flagged() {
    let s = shutdown_project();
    let out = irr(&s);
    assert!(out.ambiguous_root);
    for root in &out.roots {
        assert!(npv(&s, *root).unwrap().abs() < 1e-6);
        // Confirm by bracketing
        let below = npv(&s, root - 1e-3).unwrap();
        let above = npv(&s, root + 1e-3).unwrap();
        assert!(below * above < 0.0, "root {root} not bracketed");
    }
    let chosen = out.rate.value().unwrap();
    assert!(out.roots.iter().all(|r| chosen.abs() <= r.abs()));

    let valuation = evaluate(&s, 0.12).unwrap();
    assert_eq!(
        valuation.advisories,
        vec![Advisory::AmbiguousRoot { sign_changes: 2 }]
    );
}

#[test]
fn test_shutdown_project_mirr() {
    assert_relative_eq!(mirr(&shutdown_project(), 0.12).unwrap(), 0.1081576597, epsilon = 1e-9);
}

// ===========================================================================
// Undefined metrics
// ===========================================================================

#[test]
fn test_mirr_without_later_negative_flows() {
    let s = CashFlowSeries::new(vec![50.0, 10.0, 10.0]).unwrap();
    assert!(matches!(
        mirr(&s, 0.1),
        Err(AppraisalError::DivisionUndefined { .. })
    ));
}

#[test]
fn test_payback_never_reached_is_undefined() {
    let s = CashFlowSeries::level(-1000.0, 10.0, 10).unwrap();
    assert_eq!(payback_period(&s), None);
    let v = evaluate(&s, 0.05).unwrap();
    assert_eq!(v.payback_period.reason(), Some(UndefinedReason::NotRecovered));
}

// ===========================================================================
// Perpetuities
// ===========================================================================

#[test]
fn test_level_perpetuity_investment() {
    let npv = perpetuity_pv(2.01, 0.078).unwrap() - 9.8;
    assert_relative_eq!(npv, 15.9692, epsilon = 1e-4);
}

#[test]
fn test_growing_perpetuity_and_crossover() {
    let npv = growing_perpetuity_pv(1.47, 0.078, 0.026).unwrap() - 9.8;
    assert_relative_eq!(npv, 18.4692, epsilon = 1e-4);
    let k = perpetuity_crossover_rate(2.01, 1.47, 0.026).unwrap().unwrap();
    assert_relative_eq!(k, 0.0967778, epsilon = 1e-6);
    // At the crossover both streams are worth the same
    assert_relative_eq!(
        perpetuity_pv(2.01, k).unwrap(),
        growing_perpetuity_pv(1.47, k, 0.026).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn test_perpetuity_input_deserialises() {
    let input: PerpetuityInput = serde_json::from_str(
        r#"{"initial_investment": 9.8, "rate": 0.078, "level_cash_flow": 2.01,
            "growing": {"cash_flow": 1.47, "growth": 0.026}}"#,
    )
    .unwrap();
    assert!(input.growing.is_some());
}

#[test]
fn test_level_series_pays_back_on_schedule() {
    let s = CashFlowSeries::level(-9.8, 2.01, 100).unwrap();
    let v = evaluate(&s, 0.078).unwrap();
    assert_eq!(v.payback_period.value(), Some(5));
    assert_eq!(v.discounted_payback_period.value(), Some(7));
    assert_relative_eq!(v.irr.value().unwrap(), 0.2051020, epsilon = 1e-6);
}
