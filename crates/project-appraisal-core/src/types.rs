use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AppraisalError;
use crate::AppraisalResult;

/// Monetary amounts in model currency units. Signed: outflows are negative.
pub type Money = f64;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Period index; period 0 is the initial outlay.
pub type Period = usize;

/// Why a partial metric has no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// No discount rate in the search domain sets NPV to zero.
    NoRealRoot,
    /// A bracketed root exists but the solver failed to pin it down.
    NoConvergence,
    /// A ratio had a zero denominator (MIRR without negative flows).
    DivisionUndefined,
    /// Cumulative cash flow never reaches zero within the series.
    NotRecovered,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UndefinedReason::NoRealRoot => "no real root in search domain",
            UndefinedReason::NoConvergence => "solver did not converge",
            UndefinedReason::DivisionUndefined => "division undefined",
            UndefinedReason::NotRecovered => "outlay not recovered within horizon",
        };
        f.write_str(s)
    }
}

/// A metric that may have no defined value.
///
/// Keeps "zero" distinct from "no solution" and "solver failure" so batch
/// summaries can count and exclude undefined results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Metric<T> {
    Defined { value: T },
    Undefined { reason: UndefinedReason },
}

impl<T: Copy> Metric<T> {
    pub fn defined(value: T) -> Self {
        Metric::Defined { value }
    }

    pub fn undefined(reason: UndefinedReason) -> Self {
        Metric::Undefined { reason }
    }

    pub fn from_option(value: Option<T>, reason: UndefinedReason) -> Self {
        match value {
            Some(value) => Metric::Defined { value },
            None => Metric::Undefined { reason },
        }
    }

    pub fn value(&self) -> Option<T> {
        match self {
            Metric::Defined { value } => Some(*value),
            Metric::Undefined { .. } => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Metric::Defined { .. })
    }

    pub fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Metric::Defined { .. } => None,
            Metric::Undefined { reason } => Some(*reason),
        }
    }
}

/// Cash flows for periods 0..N. Period 0 is the net initial outlay.
///
/// Immutable once built: the flows are private and only readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Money>", into = "Vec<Money>")]
pub struct CashFlowSeries {
    flows: Vec<Money>,
}

impl CashFlowSeries {
    /// Build a series from explicit flows. Requires at least one finite flow.
    pub fn new(flows: Vec<Money>) -> AppraisalResult<Self> {
        if flows.is_empty() {
            return Err(AppraisalError::InsufficientData(
                "A cash-flow series needs at least the period 0 flow".into(),
            ));
        }
        if let Some(t) = flows.iter().position(|cf| !cf.is_finite()) {
            return Err(AppraisalError::invalid(
                format!("flows[{t}]"),
                "Cash flows must be finite",
            ));
        }
        Ok(Self { flows })
    }

    /// Level series: `initial_outlay` at period 0, then `cash_flow` for
    /// each of `periods` periods.
    pub fn level(initial_outlay: Money, cash_flow: Money, periods: usize) -> AppraisalResult<Self> {
        if periods < 1 {
            return Err(AppraisalError::invalid("periods", "Must be at least 1"));
        }
        let mut flows = Vec::with_capacity(periods + 1);
        flows.push(initial_outlay);
        flows.extend(std::iter::repeat(cash_flow).take(periods));
        Self::new(flows)
    }

    /// Growing series: `initial_outlay` at period 0, then `first` at
    /// period 1 growing by `growth` per period, `first * (1 + g)^(t - 1)`.
    pub fn growing(
        initial_outlay: Money,
        first: Money,
        growth: Rate,
        periods: usize,
    ) -> AppraisalResult<Self> {
        if periods < 1 {
            return Err(AppraisalError::invalid("periods", "Must be at least 1"));
        }
        if !growth.is_finite() || growth <= -1.0 {
            return Err(AppraisalError::invalid(
                "growth",
                "Must be finite and greater than -100%",
            ));
        }
        let mut flows = Vec::with_capacity(periods + 1);
        flows.push(initial_outlay);
        let stream = std::iter::successors(Some(first), |cf| Some(cf * (1.0 + growth)));
        flows.extend(stream.take(periods));
        Self::new(flows)
    }

    /// Add `amount` to the final period (e.g. working capital recovery).
    pub fn with_terminal_adjustment(mut self, amount: Money) -> Self {
        if let Some(last) = self.flows.last_mut() {
            *last += amount;
        }
        self
    }

    /// Append `amount` as a new final period (e.g. a shutdown cost paid
    /// the period after operations end).
    pub fn with_terminal_flow(mut self, amount: Money) -> Self {
        self.flows.push(amount);
        self
    }

    pub fn flows(&self) -> &[Money] {
        &self.flows
    }

    pub fn initial_outlay(&self) -> Money {
        self.flows[0]
    }

    /// Periods 1..N.
    pub fn operating(&self) -> &[Money] {
        &self.flows[1..]
    }

    /// Number of periods after period 0.
    pub fn horizon(&self) -> usize {
        self.flows.len() - 1
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// True when every operating period carries the same amount.
    pub fn is_level(&self) -> bool {
        match self.operating().split_first() {
            Some((first, rest)) => rest.iter().all(|cf| cf == first),
            None => false,
        }
    }

    /// Number of sign changes across the series, ignoring zero flows.
    pub fn sign_changes(&self) -> usize {
        let mut changes = 0;
        let mut previous: Option<bool> = None;
        for cf in self.flows.iter().filter(|cf| **cf != 0.0) {
            let positive = *cf > 0.0;
            if let Some(prev) = previous {
                if prev != positive {
                    changes += 1;
                }
            }
            previous = Some(positive);
        }
        changes
    }

    /// Cumulative sums of periods 0..=t for every t.
    pub fn cumulative(&self) -> Vec<Money> {
        self.flows
            .iter()
            .scan(0.0, |acc, cf| {
                *acc += cf;
                Some(*acc)
            })
            .collect()
    }
}

impl TryFrom<Vec<Money>> for CashFlowSeries {
    type Error = AppraisalError;

    fn try_from(flows: Vec<Money>) -> Result<Self, Self::Error> {
        CashFlowSeries::new(flows)
    }
}

impl From<CashFlowSeries> for Vec<Money> {
    fn from(series: CashFlowSeries) -> Self {
        series.flows
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}
