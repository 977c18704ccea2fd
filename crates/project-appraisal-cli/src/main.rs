mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::appraisal::AppraisalArgs;
use commands::metrics::{MetricsArgs, PerpetuityArgs};
use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::{ScenarioArgs, SensitivityArgs};

/// Capital-budgeting appraisal of investment projects
#[derive(Parser)]
#[command(
    name = "appraise",
    version,
    about = "Capital-budgeting appraisal of investment projects",
    long_about = "Project incremental after-tax cash flows, value them with NPV, IRR, MIRR \
                  and payback rules, and explore uncertainty through scenarios, \
                  sensitivity tables and seeded Monte Carlo simulation."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Project period-by-period incremental cash flows of a scenario
    CashFlows(AppraisalArgs),
    /// Project and value a scenario (NPV, IRR, MIRR, payback)
    Appraise(AppraisalArgs),
    /// Value an explicit or level cash-flow series
    Metrics(MetricsArgs),
    /// Compare level and growing perpetuities
    Perpetuity(PerpetuityArgs),
    /// Seeded Monte Carlo simulation of a scenario
    MonteCarlo(MonteCarloArgs),
    /// Probability-weighted expected NPV of discrete scenarios
    Scenarios(ScenarioArgs),
    /// Marginal sensitivity and two-way NPV grid
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::CashFlows(args) => commands::appraisal::run_cash_flows(args),
        Commands::Appraise(args) => commands::appraisal::run_appraise(args),
        Commands::Metrics(args) => commands::metrics::run_metrics(args),
        Commands::Perpetuity(args) => commands::metrics::run_perpetuity(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::Version => {
            println!("appraise {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
