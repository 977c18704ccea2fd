#![allow(dead_code)]

use project_appraisal_core::cash_flow::{
    DepreciationPolicy, ProductLine, SalesEffect, SalesVolumes, ScenarioParameters, SetupCost,
    TaxLossPolicy,
};

/// Golf-club launch: a new mid-range line, a cheap line, and lost sales of
/// the existing high-end line.
pub fn golf_clubs() -> ScenarioParameters {
    ScenarioParameters {
        product_lines: vec![
            ProductLine {
                name: "new".into(),
                unit_price: 700.0,
                unit_variable_cost: 320.0,
                effect: SalesEffect::Incremental,
            },
            ProductLine {
                name: "high".into(),
                unit_price: 1100.0,
                unit_variable_cost: 600.0,
                effect: SalesEffect::Cannibalised,
            },
            ProductLine {
                name: "cheap".into(),
                unit_price: 400.0,
                unit_variable_cost: 180.0,
                effect: SalesEffect::Incremental,
            },
        ],
        fixed_costs: 7_500_000.0,
        capital_expenditure: 18_200_000.0,
        depreciation: DepreciationPolicy::DecliningBalance { rate: 0.2 },
        working_capital: 950_000.0,
        salvage_value: None,
        tax_rate: 0.28,
        tax_losses: TaxLossPolicy::Credit,
        discount_rate: 0.14,
        horizon: 7,
        setup_costs: vec![
            SetupCost {
                label: "r&d".into(),
                amount: 1_000_000.0,
            },
            SetupCost {
                label: "market study".into(),
                amount: 150_000.0,
            },
        ],
    }
}

pub fn golf_volumes() -> SalesVolumes {
    SalesVolumes::from([
        ("new".to_string(), 55_000.0),
        ("high".to_string(), 13_000.0),
        ("cheap".to_string(), 10_000.0),
    ])
}
