use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::AppraisalError;
use crate::types::{Money, Rate};
use crate::AppraisalResult;

/// Longest projection accepted, in periods.
pub const MAX_HORIZON: usize = 1_000;

/// Whether a product line's sales add to or displace the firm's revenue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesEffect {
    /// New sales created by the project.
    #[default]
    Incremental,
    /// Sales of an existing product lost to the project. Revenue and
    /// variable cost enter with a negative sign.
    Cannibalised,
}

impl SalesEffect {
    pub fn sign(self) -> f64 {
        match self {
            SalesEffect::Incremental => 1.0,
            SalesEffect::Cannibalised => -1.0,
        }
    }
}

/// A product line affected by the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub name: String,
    pub unit_price: Money,
    pub unit_variable_cost: Money,
    #[serde(default)]
    pub effect: SalesEffect,
}

/// How the capital expenditure is written down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DepreciationPolicy {
    /// Equal charges of `capex / life`. `life` defaults to the horizon.
    StraightLine {
        #[serde(default)]
        life: Option<usize>,
    },
    /// Each period charges `book_value * rate`.
    DecliningBalance { rate: Rate },
}

/// Treatment of negative taxable income.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxLossPolicy {
    /// Negative taxes are a credit against the firm's other income.
    #[default]
    Credit,
    /// Taxes floor at zero.
    NoCredit,
}

/// A one-time cost paid at period 0 (R&D, market study, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupCost {
    pub label: String,
    pub amount: Money,
}

/// Immutable description of a capital project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    pub product_lines: Vec<ProductLine>,
    /// Fixed operating costs per period.
    pub fixed_costs: Money,
    pub capital_expenditure: Money,
    pub depreciation: DepreciationPolicy,
    /// Committed at period 0, recovered in the final period.
    pub working_capital: Money,
    /// Sale value of the asset at the end of the horizon. When set, the
    /// final period books after-tax disposal proceeds against the closing
    /// book value; when absent the remaining book value is ignored.
    #[serde(default)]
    pub salvage_value: Option<Money>,
    pub tax_rate: Rate,
    #[serde(default)]
    pub tax_losses: TaxLossPolicy,
    /// Cost of capital.
    pub discount_rate: Rate,
    /// Number of operating periods.
    pub horizon: usize,
    #[serde(default)]
    pub setup_costs: Vec<SetupCost>,
}

/// Per-period unit sales keyed by product-line name.
pub type SalesVolumes = BTreeMap<String, f64>;

fn require_finite(value: f64, field: &str) -> AppraisalResult<()> {
    if !value.is_finite() {
        return Err(AppraisalError::invalid(field, "Must be finite"));
    }
    Ok(())
}

fn require_non_negative(value: f64, field: &str) -> AppraisalResult<()> {
    require_finite(value, field)?;
    if value < 0.0 {
        return Err(AppraisalError::invalid(field, "Must be non-negative"));
    }
    Ok(())
}

impl ScenarioParameters {
    pub fn validate(&self) -> AppraisalResult<()> {
        if self.horizon < 1 || self.horizon > MAX_HORIZON {
            return Err(AppraisalError::invalid(
                "horizon",
                format!("Must be between 1 and {MAX_HORIZON} periods"),
            ));
        }
        if !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(AppraisalError::invalid("tax_rate", "Must be between 0 and 1"));
        }
        if !self.discount_rate.is_finite() || self.discount_rate <= -1.0 {
            return Err(AppraisalError::invalid(
                "discount_rate",
                "Must be finite and greater than -100%",
            ));
        }
        require_non_negative(self.fixed_costs, "fixed_costs")?;
        require_non_negative(self.capital_expenditure, "capital_expenditure")?;
        require_non_negative(self.working_capital, "working_capital")?;
        if let Some(salvage) = self.salvage_value {
            require_non_negative(salvage, "salvage_value")?;
        }

        match self.depreciation {
            DepreciationPolicy::DecliningBalance { rate } => {
                if !(rate > 0.0 && rate <= 1.0) {
                    return Err(AppraisalError::invalid(
                        "depreciation.rate",
                        "Declining-balance rate must be in (0, 1]",
                    ));
                }
            }
            DepreciationPolicy::StraightLine { life: Some(0) } => {
                return Err(AppraisalError::invalid(
                    "depreciation.life",
                    "Straight-line life must be at least 1 period",
                ));
            }
            DepreciationPolicy::StraightLine { .. } => {}
        }

        for cost in &self.setup_costs {
            require_non_negative(cost.amount, &format!("setup_costs:{}", cost.label))?;
        }

        if self.product_lines.is_empty() {
            return Err(AppraisalError::InsufficientData(
                "At least one product line is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for line in &self.product_lines {
            if line.name.trim().is_empty() {
                return Err(AppraisalError::invalid("product_lines", "Names must be non-empty"));
            }
            if !seen.insert(line.name.as_str()) {
                return Err(AppraisalError::invalid(
                    format!("product_lines:{}", line.name),
                    "Duplicate product line",
                ));
            }
            require_finite(line.unit_price, &format!("product_lines:{}.unit_price", line.name))?;
            require_finite(
                line.unit_variable_cost,
                &format!("product_lines:{}.unit_variable_cost", line.name),
            )?;
        }
        Ok(())
    }

    /// Check that `volumes` covers exactly the configured product lines.
    pub fn validate_volumes(&self, volumes: &SalesVolumes) -> AppraisalResult<()> {
        for line in &self.product_lines {
            match volumes.get(&line.name) {
                Some(v) => require_finite(*v, &format!("volumes:{}", line.name))?,
                None => {
                    return Err(AppraisalError::invalid(
                        format!("volumes:{}", line.name),
                        "Missing sales volume for product line",
                    ))
                }
            }
        }
        if let Some(unknown) = volumes
            .keys()
            .find(|name| !self.product_lines.iter().any(|l| &l.name == *name))
        {
            return Err(AppraisalError::invalid(
                format!("volumes:{unknown}"),
                "Unknown product line",
            ));
        }
        Ok(())
    }

    pub fn product_line(&self, name: &str) -> Option<&ProductLine> {
        self.product_lines.iter().find(|l| l.name == name)
    }

    pub(crate) fn product_line_mut(&mut self, name: &str) -> AppraisalResult<&mut ProductLine> {
        self.product_lines
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| {
                AppraisalError::invalid(format!("product_lines:{name}"), "Unknown product line")
            })
    }

    pub fn total_setup_costs(&self) -> Money {
        self.setup_costs.iter().map(|c| c.amount).sum()
    }

    /// Net initial outlay at period 0 (negative).
    pub fn initial_outlay(&self) -> Money {
        -(self.total_setup_costs() + self.capital_expenditure + self.working_capital)
    }
}
