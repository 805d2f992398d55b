use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::error::Error;

use valuekit_core::dividend_policy::ddm::{self, DdmInput, DdmModel};

use super::{discount_rate_or_capm, load_snapshot, required};
use crate::config::HouseAssumptions;
use crate::input;

/// Arguments for the dividend discount model
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DdmArgs {
    /// Path to JSON input file with DDM parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Provider snapshot supplying dividend, price, beta and payout ratio
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Current annual dividend per share (D0)
    #[arg(long)]
    pub dividend: Option<Decimal>,

    /// Required return; CAPM cost of equity when omitted
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Beta for the CAPM required return
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Constant growth rate (single-stage model)
    #[arg(long, conflicts_with = "high_growth_rate")]
    pub growth_rate: Option<Decimal>,

    /// Growth during the high-growth phase (multi-stage model)
    #[arg(long, requires_all = ["high_growth_years", "terminal_growth"])]
    pub high_growth_rate: Option<Decimal>,

    /// Length of the high-growth phase in years
    #[arg(long)]
    pub high_growth_years: Option<u32>,

    /// Perpetual growth after the high-growth phase
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Current market price per share
    #[arg(long)]
    pub market_price: Option<Decimal>,

    /// Dividends / earnings, for the sustainability check
    #[arg(long)]
    pub payout_ratio: Option<Decimal>,
}

pub fn run_ddm(args: DdmArgs, house: &HouseAssumptions) -> Result<Value, Box<dyn Error>> {
    let ddm_input: DdmInput = match input::load(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => ddm_input_from_flags(&args, house)?,
    };

    let result = ddm::calculate_ddm(&ddm_input)?;
    Ok(serde_json::to_value(result)?)
}

fn ddm_input_from_flags(args: &DdmArgs, house: &HouseAssumptions) -> Result<DdmInput, Box<dyn Error>> {
    let snap = load_snapshot(args.snapshot.as_deref())?.unwrap_or_default();

    let dividend = match args.dividend {
        Some(d) => d,
        None if args.snapshot.is_some() => snap.require_dividend()?,
        None => required(None, "dividend")?,
    };

    let model = match args.high_growth_rate {
        Some(high_growth_rate) => DdmModel::MultiStage {
            high_growth_rate,
            high_growth_years: required(args.high_growth_years, "high-growth-years")?,
            terminal_growth: required(args.terminal_growth, "terminal-growth")?,
        },
        None => DdmModel::SingleStage {
            growth_rate: required(args.growth_rate, "growth-rate")?,
        },
    };

    let discount_rate = discount_rate_or_capm(args.discount_rate, args.beta.or(snap.beta), house)?;

    Ok(DdmInput {
        dividend,
        discount_rate,
        model,
        market_price: args.market_price.or(snap.current_price),
        payout_ratio: args.payout_ratio.or(snap.payout_ratio),
        currency: snap.currency.clone(),
    })
}
