use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::error::Error;

use valuekit_core::financials::{self, StatementLineItems};
use valuekit_core::valuation::capm::{self, CapmInput};
use valuekit_core::valuation::dcf::{self, DcfInput};
use valuekit_core::valuation::peer_comparison::{self, PeerDcfInput};
use valuekit_core::valuation::terminal::TerminalAssumption;

use super::{load_snapshot, required};
use crate::config::HouseAssumptions;
use crate::input;

/// Arguments for the CAPM cost of equity
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CapmArgs {
    /// Levered equity beta (house default beta when omitted)
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Override the house risk-free rate (e.g. 0.045 for 4.5%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Override the house expected market return
    #[arg(long)]
    pub market_return: Option<Decimal>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a free-cash-flow DCF
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON input file with DCF parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Provider snapshot supplying FCF, beta, shares and price when not given as flags
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Latest annual free cash flow
    #[arg(long)]
    pub base_fcf: Option<Decimal>,

    /// Annual FCF growth over the explicit horizon
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Discount rate; derived from CAPM when omitted
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Beta for the CAPM discount rate
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Terminal growth rate (Gordon growth terminal value)
    #[arg(long, conflicts_with = "exit_multiple")]
    pub terminal_growth: Option<Decimal>,

    /// Exit multiple applied to the final-year FCF
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,

    /// Projection years
    #[arg(long)]
    pub years: Option<u32>,

    /// Shares outstanding, for the per-share value
    #[arg(long)]
    pub shares_outstanding: Option<Decimal>,

    /// Current market price per share
    #[arg(long)]
    pub market_price: Option<Decimal>,
}

/// Arguments for the side-by-side peer DCF
#[derive(Args)]
pub struct CompareArgs {
    /// JSON array of company snapshots, or a full comparison input object
    #[arg(long)]
    pub input: Option<String>,

    /// Maximum number of companies valued
    #[arg(long)]
    pub max_companies: Option<usize>,
}

/// Arguments for free-cash-flow derivation
#[derive(Args)]
pub struct FcfArgs {
    /// JSON object of cash-flow statement line items
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_capm(args: CapmArgs, house: &HouseAssumptions) -> Result<Value, Box<dyn Error>> {
    let capm_input: CapmInput = match input::load(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let mut assumptions = house.capm.clone();
            if let Some(rf) = args.risk_free_rate {
                assumptions.risk_free_rate = rf;
            }
            if let Some(rm) = args.market_return {
                assumptions.market_return = rm;
            }
            CapmInput {
                beta: args.beta,
                assumptions,
            }
        }
    };

    let result = capm::calculate_capm(&capm_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: DcfArgs, house: &HouseAssumptions) -> Result<Value, Box<dyn Error>> {
    let dcf_input: DcfInput = match input::load(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => dcf_input_from_flags(&args, house)?,
    };

    let result = dcf::calculate_dcf(&dcf_input)?;
    Ok(serde_json::to_value(result)?)
}

fn dcf_input_from_flags(args: &DcfArgs, house: &HouseAssumptions) -> Result<DcfInput, Box<dyn Error>> {
    let snap = load_snapshot(args.snapshot.as_deref())?.unwrap_or_default();

    let base_fcf = match args.base_fcf {
        Some(fcf) => fcf,
        None if args.snapshot.is_some() => snap.require_fcf()?,
        None => required(None, "base-fcf")?,
    };
    let terminal = match (args.terminal_growth, args.exit_multiple) {
        (_, Some(multiple)) => TerminalAssumption::ExitMultiple { multiple },
        (Some(terminal_growth), None) => TerminalAssumption::GordonGrowth { terminal_growth },
        (None, None) => return Err("--terminal-growth or --exit-multiple is required".into()),
    };

    // Without an explicit rate the core derives it from CAPM and reports
    // a defaulted beta in the warnings.
    let capm = match args.discount_rate {
        Some(_) => None,
        None => Some(CapmInput {
            beta: args.beta.or(snap.beta),
            assumptions: house.capm.clone(),
        }),
    };

    Ok(DcfInput {
        base_fcf,
        growth_rate: required(args.growth_rate, "growth-rate")?,
        horizon: args.years,
        discount_rate: args.discount_rate,
        capm,
        terminal,
        shares_outstanding: args.shares_outstanding.or(snap.shares_outstanding),
        market_price: args.market_price.or(snap.current_price),
        currency: snap.currency.clone(),
    })
}

pub fn run_compare(args: CompareArgs, house: &HouseAssumptions) -> Result<Value, Box<dyn Error>> {
    let data: Value = input::load(args.input.as_deref())?
        .ok_or("--input file (or piped JSON) is required for compare")?;

    let mut compare_input = if data.is_array() {
        PeerDcfInput {
            companies: serde_json::from_value(data)?,
            assumptions: house.peer_dcf.clone(),
            max_companies: None,
        }
    } else {
        let has_assumptions = data.get("assumptions").is_some();
        let mut parsed: PeerDcfInput = serde_json::from_value(data)?;
        if !has_assumptions {
            parsed.assumptions = house.peer_dcf.clone();
        }
        parsed
    };
    if args.max_companies.is_some() {
        compare_input.max_companies = args.max_companies;
    }

    let result = peer_comparison::compare_peer_dcf(&compare_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_fcf(args: FcfArgs) -> Result<Value, Box<dyn Error>> {
    let items: StatementLineItems = input::load(args.input.as_deref())?
        .ok_or("--input file (or piped JSON) of statement line items is required")?;

    let derivation = financials::derive_free_cash_flow(&items)?;
    Ok(serde_json::to_value(derivation)?)
}
