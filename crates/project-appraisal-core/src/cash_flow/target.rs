use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::params::{SalesVolumes, ScenarioParameters};
use crate::error::AppraisalError;
use crate::AppraisalResult;

/// A single scalar input of a scenario that can be perturbed, swept or
/// simulated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum InputTarget {
    Volume { line: String },
    UnitPrice { line: String },
    UnitVariableCost { line: String },
    FixedCosts,
    DiscountRate,
}

impl fmt::Display for InputTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputTarget::Volume { line } => write!(f, "volume:{line}"),
            InputTarget::UnitPrice { line } => write!(f, "unit_price:{line}"),
            InputTarget::UnitVariableCost { line } => write!(f, "unit_variable_cost:{line}"),
            InputTarget::FixedCosts => f.write_str("fixed_costs"),
            InputTarget::DiscountRate => f.write_str("discount_rate"),
        }
    }
}

impl FromStr for InputTarget {
    type Err = AppraisalError;

    /// Parse the `Display` form, e.g. `volume:new` or `discount_rate`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, line) = match s.split_once(':') {
            Some((kind, line)) if !line.is_empty() => (kind, Some(line.to_string())),
            Some((kind, _)) => (kind, None),
            None => (s, None),
        };
        match (kind, line) {
            ("volume", Some(line)) => Ok(InputTarget::Volume { line }),
            ("unit_price", Some(line)) => Ok(InputTarget::UnitPrice { line }),
            ("unit_variable_cost", Some(line)) => Ok(InputTarget::UnitVariableCost { line }),
            ("fixed_costs", None) => Ok(InputTarget::FixedCosts),
            ("discount_rate", None) => Ok(InputTarget::DiscountRate),
            _ => Err(AppraisalError::invalid(
                "target",
                format!(
                    "Unknown input '{s}': expected volume:<line>, unit_price:<line>, \
                     unit_variable_cost:<line>, fixed_costs or discount_rate"
                ),
            )),
        }
    }
}

fn unknown_line(line: &str) -> AppraisalError {
    AppraisalError::invalid(format!("product_lines:{line}"), "Unknown product line")
}

impl InputTarget {
    /// Current value of the input.
    pub fn current(
        &self,
        params: &ScenarioParameters,
        volumes: &SalesVolumes,
    ) -> AppraisalResult<f64> {
        match self {
            InputTarget::Volume { line } => {
                volumes.get(line).copied().ok_or_else(|| unknown_line(line))
            }
            InputTarget::UnitPrice { line } => params
                .product_line(line)
                .map(|l| l.unit_price)
                .ok_or_else(|| unknown_line(line)),
            InputTarget::UnitVariableCost { line } => params
                .product_line(line)
                .map(|l| l.unit_variable_cost)
                .ok_or_else(|| unknown_line(line)),
            InputTarget::FixedCosts => Ok(params.fixed_costs),
            InputTarget::DiscountRate => Ok(params.discount_rate),
        }
    }

    /// Overwrite the input with `value`. The caller owns the copies.
    pub fn set(
        &self,
        params: &mut ScenarioParameters,
        volumes: &mut SalesVolumes,
        value: f64,
    ) -> AppraisalResult<()> {
        match self {
            InputTarget::Volume { line } => {
                let slot = volumes.get_mut(line).ok_or_else(|| unknown_line(line))?;
                *slot = value;
            }
            InputTarget::UnitPrice { line } => params.product_line_mut(line)?.unit_price = value,
            InputTarget::UnitVariableCost { line } => {
                params.product_line_mut(line)?.unit_variable_cost = value
            }
            InputTarget::FixedCosts => params.fixed_costs = value,
            InputTarget::DiscountRate => params.discount_rate = value,
        }
        Ok(())
    }

    /// Add `delta` to the input.
    pub fn shift(
        &self,
        params: &mut ScenarioParameters,
        volumes: &mut SalesVolumes,
        delta: f64,
    ) -> AppraisalResult<()> {
        let value = self.current(params, volumes)? + delta;
        self.set(params, volumes, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash_flow::params::{DepreciationPolicy, ProductLine, SalesEffect, TaxLossPolicy};

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
            tax_rate: 0.3,
            tax_losses: TaxLossPolicy::Credit,
            discount_rate: 0.1,
            horizon: 3,
            setup_costs: vec![],
        }
    }

    #[test]
    fn test_shift_each_target() {
        let mut p = params();
        let mut v = SalesVolumes::from([("widget".to_string(), 50.0)]);
        let widget = || "widget".to_string();

        InputTarget::Volume { line: widget() }.shift(&mut p, &mut v, 1.0).unwrap();
        InputTarget::UnitPrice { line: widget() }.shift(&mut p, &mut v, 1.0).unwrap();
        InputTarget::UnitVariableCost { line: widget() }.shift(&mut p, &mut v, -1.0).unwrap();
        InputTarget::FixedCosts.shift(&mut p, &mut v, 10.0).unwrap();
        InputTarget::DiscountRate.set(&mut p, &mut v, 0.2).unwrap();

        assert_eq!(v["widget"], 51.0);
        assert_eq!(p.product_lines[0].unit_price, 11.0);
        assert_eq!(p.product_lines[0].unit_variable_cost, 3.0);
        assert_eq!(p.fixed_costs, 110.0);
        assert_eq!(p.discount_rate, 0.2);
    }

    #[test]
    fn test_unknown_line_rejected() {
        let mut p = params();
        let mut v = SalesVolumes::new();
        let t = InputTarget::UnitPrice { line: "gadget".into() };
        assert!(t.current(&p, &v).is_err());
        assert!(t.set(&mut p, &mut v, 1.0).is_err());
    }

    #[test]
    fn test_target_serde_and_display() {
        let t: InputTarget = serde_json::from_str(r#"{"input":"volume","line":"widget"}"#).unwrap();
        assert_eq!(t.to_string(), "volume:widget");
        let t: InputTarget = serde_json::from_str(r#"{"input":"discount_rate"}"#).unwrap();
        assert_eq!(t, InputTarget::DiscountRate);
    }

    #[test]
    fn test_parse_display_form() {
        for t in [
            InputTarget::Volume { line: "high end".into() },
            InputTarget::UnitVariableCost { line: "cheap".into() },
            InputTarget::FixedCosts,
            InputTarget::DiscountRate,
        ] {
            assert_eq!(t.to_string().parse::<InputTarget>().unwrap(), t);
        }
        assert!("volume".parse::<InputTarget>().is_err());
        assert!("fixed_costs:new".parse::<InputTarget>().is_err());
        assert!("margin".parse::<InputTarget>().is_err());
    }
}
