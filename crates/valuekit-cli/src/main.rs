mod commands;
mod config;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::Value;
use std::error::Error;
use std::process;

use commands::comps::CompsArgs;
use commands::dividend::DdmArgs;
use commands::scenarios::SensitivityArgs;
use commands::valuation::{CapmArgs, CompareArgs, DcfArgs, FcfArgs};
use config::HouseAssumptions;

/// Equity valuation with decimal precision
#[derive(Parser)]
#[command(
    name = "valuekit",
    version,
    about = "Equity valuation with decimal precision",
    long_about = "A CLI for valuing equities from their financial figures: CAPM cost of \
                  equity, free-cash-flow DCF, dividend discount models, peer multiples \
                  scoring, sensitivity grids and side-by-side peer DCF comparison."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// House assumptions file (JSON or YAML); falls back to $VALUEKIT_ASSUMPTIONS
    #[arg(long, global = true)]
    assumptions: Option<String>,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Cost of equity via CAPM
    Capm(CapmArgs),
    /// Free-cash-flow DCF valuation
    Dcf(DcfArgs),
    /// Dividend discount model (single or multi-stage)
    Ddm(DdmArgs),
    /// Score peers by their valuation multiples
    Comps(CompsArgs),
    /// DCF sensitivity grid against the discount rate
    Sensitivity(SensitivityArgs),
    /// Side-by-side DCF of several companies under house assumptions
    Compare(CompareArgs),
    /// Derive free cash flow from cash-flow statement line items
    Fcf(FcfArgs),
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

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Version => {
            println!("valuekit {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        command => run(command, cli.assumptions.as_deref()),
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

fn run(command: Commands, assumptions: Option<&str>) -> Result<Value, Box<dyn Error>> {
    let house = HouseAssumptions::load(assumptions)?;
    match command {
        Commands::Capm(args) => commands::valuation::run_capm(args, &house),
        Commands::Dcf(args) => commands::valuation::run_dcf(args, &house),
        Commands::Ddm(args) => commands::dividend::run_ddm(args, &house),
        Commands::Comps(args) => commands::comps::run_comps(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args, &house),
        Commands::Compare(args) => commands::valuation::run_compare(args, &house),
        Commands::Fcf(args) => commands::valuation::run_fcf(args),
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}
