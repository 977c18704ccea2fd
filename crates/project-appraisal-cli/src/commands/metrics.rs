use clap::Args;
use serde_json::Value;

use project_appraisal_core::valuation::{self, GrowingStream, PerpetuityInput, SeriesInput};
use project_appraisal_core::CashFlowSeries;

use crate::input;

/// Arguments for valuing an explicit cash-flow series
#[derive(Args)]
pub struct MetricsArgs {
    /// Path to a JSON or YAML file with `flows` and `rate`
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated flows, period 0 first (e.g. "-100,30,40,50")
    #[arg(long, allow_hyphen_values = true)]
    pub flows: Option<String>,

    /// Period-0 outlay of a level series (negative)
    #[arg(long, allow_hyphen_values = true)]
    pub initial: Option<f64>,

    /// Level cash flow for periods 1..=N
    #[arg(long, allow_hyphen_values = true)]
    pub cash_flow: Option<f64>,

    /// Number of level periods
    #[arg(long)]
    pub periods: Option<usize>,

    /// Amount added to the last level period
    #[arg(long, allow_hyphen_values = true)]
    pub terminal_adjustment: Option<f64>,

    /// Extra flow one period after the last level period
    #[arg(long, allow_hyphen_values = true)]
    pub terminal_flow: Option<f64>,

    /// Discount rate
    #[arg(long)]
    pub rate: Option<f64>,

    /// MIRR finance rate (defaults to --rate)
    #[arg(long)]
    pub finance_rate: Option<f64>,

    /// MIRR reinvestment rate (defaults to --rate)
    #[arg(long)]
    pub reinvest_rate: Option<f64>,
}

/// Arguments for level and growing perpetuities
#[derive(Args)]
pub struct PerpetuityArgs {
    /// Path to a JSON or YAML file
    #[arg(long)]
    pub input: Option<String>,

    /// Initial investment (positive amount)
    #[arg(long)]
    pub investment: Option<f64>,

    /// Discount rate
    #[arg(long)]
    pub rate: Option<f64>,

    /// Level cash flow per period
    #[arg(long, allow_hyphen_values = true)]
    pub cash_flow: Option<f64>,

    /// First cash flow of the growing alternative
    #[arg(long, allow_hyphen_values = true)]
    pub growing_cash_flow: Option<f64>,

    /// Growth rate of the growing alternative
    #[arg(long, allow_hyphen_values = true)]
    pub growth: Option<f64>,

    /// Periods used for payback and IRR of each stream (default 100)
    #[arg(long)]
    pub horizon: Option<usize>,
}

fn parse_flows(list: &str) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    list.split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|e| {
                    let msg = format!("Invalid flow '{}': {}", s.trim(), e);
                    Box::<dyn std::error::Error>::from(msg)
                })
        })
        .collect()
}

fn series_from_flags(
    args: &MetricsArgs,
) -> Result<Option<CashFlowSeries>, Box<dyn std::error::Error>> {
    if let Some(ref list) = args.flows {
        return Ok(Some(CashFlowSeries::new(parse_flows(list)?)?));
    }
    let (initial, cash_flow, periods) = match (args.initial, args.cash_flow, args.periods) {
        (None, None, None) => return Ok(None),
        (Some(i), Some(c), Some(p)) => (i, c, p),
        _ => return Err("--initial, --cash-flow and --periods must be given together".into()),
    };
    let mut series = CashFlowSeries::level(initial, cash_flow, periods)?;
    if let Some(adj) = args.terminal_adjustment {
        series = series.with_terminal_adjustment(adj);
    }
    if let Some(flow) = args.terminal_flow {
        series = series.with_terminal_flow(flow);
    }
    Ok(Some(series))
}

pub fn run_metrics(args: MetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut series_input = match series_from_flags(&args)? {
        Some(flows) => SeriesInput {
            flows,
            rate: args.rate.ok_or("--rate is required with --flows or a level series")?,
            finance_rate: None,
            reinvest_rate: None,
        },
        None => input::load(args.input.as_deref(), "metrics")?,
    };
    if let Some(rate) = args.rate {
        series_input.rate = rate;
    }
    if args.finance_rate.is_some() {
        series_input.finance_rate = args.finance_rate;
    }
    if args.reinvest_rate.is_some() {
        series_input.reinvest_rate = args.reinvest_rate;
    }
    let result = valuation::value_cash_flows(&series_input)?;
    Ok(serde_json::to_value(result)?)
}

const DEFAULT_PERPETUITY_HORIZON: usize = 100;

/// Flags override the matching fields of a loaded input.
fn apply_perpetuity_flags(
    perpetuity: &mut PerpetuityInput,
    args: &PerpetuityArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(investment) = args.investment {
        perpetuity.initial_investment = investment;
    }
    if let Some(rate) = args.rate {
        perpetuity.rate = rate;
    }
    if let Some(cash_flow) = args.cash_flow {
        perpetuity.level_cash_flow = cash_flow;
    }
    if let Some(horizon) = args.horizon {
        perpetuity.horizon = horizon;
    }
    match (args.growing_cash_flow, args.growth) {
        (Some(cash_flow), Some(growth)) => {
            perpetuity.growing = Some(GrowingStream { cash_flow, growth });
        }
        (None, None) => {}
        _ => return Err("--growing-cash-flow and --growth must be given together".into()),
    }
    Ok(())
}

pub fn run_perpetuity(args: PerpetuityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let from_file: Option<PerpetuityInput> = if args.input.is_some() {
        input::try_load(args.input.as_deref())?
    } else if args.investment.is_none() {
        input::try_load(None)?
    } else {
        None
    };

    let mut perpetuity = match from_file {
        Some(p) => p,
        None => PerpetuityInput {
            initial_investment: args.investment.ok_or("--investment is required")?,
            rate: args.rate.ok_or("--rate is required")?,
            level_cash_flow: args.cash_flow.ok_or("--cash-flow is required")?,
            growing: None,
            horizon: DEFAULT_PERPETUITY_HORIZON,
        },
    };
    apply_perpetuity_flags(&mut perpetuity, &args)?;

    let result = valuation::appraise_perpetuities(&perpetuity)?;
    Ok(serde_json::to_value(result)?)
}
