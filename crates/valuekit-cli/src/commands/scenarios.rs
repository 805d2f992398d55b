use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use std::error::Error;

use valuekit_core::scenarios::sensitivity::{self, SensitivityBase, SensitivityInput};
use valuekit_core::valuation::terminal::TerminalMethod;

use super::{load_snapshot, required};
use crate::config::HouseAssumptions;
use crate::input;

/// Which terminal parameter the grid rows vary
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GridMode {
    /// Rows vary the terminal growth rate
    Gordon,
    /// Rows vary the exit multiple
    ExitMultiple,
}

impl From<GridMode> for TerminalMethod {
    fn from(mode: GridMode) -> Self {
        match mode {
            GridMode::Gordon => TerminalMethod::GordonGrowth,
            GridMode::ExitMultiple => TerminalMethod::ExitMultiple,
        }
    }
}

/// Arguments for the DCF sensitivity grid
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct SensitivityArgs {
    /// JSON file with the base case (or a full input with "base" and "mode")
    #[arg(long)]
    pub input: Option<String>,

    /// Grid rows: terminal growth or exit multiple
    #[arg(long, value_enum, default_value = "gordon")]
    pub mode: GridMode,

    /// Provider snapshot supplying the base free cash flow
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Latest annual free cash flow
    #[arg(long)]
    pub base_fcf: Option<Decimal>,

    /// FCF growth over the explicit horizon (house growth when omitted)
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Centre discount rate (house discount rate when omitted)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Centre terminal growth (house terminal growth when omitted)
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Centre exit multiple (house exit multiple when omitted)
    #[arg(long)]
    pub exit_multiple: Option<Decimal>,

    /// Projection years
    #[arg(long)]
    pub years: Option<u32>,
}

pub fn run_sensitivity(args: SensitivityArgs, house: &HouseAssumptions) -> Result<Value, Box<dyn Error>> {
    let sens_input = match input::load::<Value>(args.input.as_deref())? {
        Some(data) if data.get("base").is_some() => serde_json::from_value(data)?,
        Some(data) => SensitivityInput {
            base: serde_json::from_value(data)?,
            mode: args.mode.into(),
        },
        None => SensitivityInput {
            base: base_from_flags(&args, house)?,
            mode: args.mode.into(),
        },
    };

    let result = sensitivity::calculate_sensitivity(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}

fn base_from_flags(args: &SensitivityArgs, house: &HouseAssumptions) -> Result<SensitivityBase, Box<dyn Error>> {
    let base_fcf = match (args.base_fcf, load_snapshot(args.snapshot.as_deref())?) {
        (Some(fcf), _) => fcf,
        (None, Some(snap)) => snap.require_fcf()?,
        (None, None) => required(None, "base-fcf")?,
    };
    let peer = &house.peer_dcf;

    Ok(SensitivityBase {
        base_fcf,
        growth_rate: args.growth_rate.unwrap_or(peer.growth_rate),
        discount_rate: args.discount_rate.unwrap_or(peer.discount_rate),
        terminal_growth: args.terminal_growth.unwrap_or(peer.terminal_growth),
        exit_multiple: args.exit_multiple.unwrap_or(peer.exit_multiple),
        horizon: args.years.unwrap_or(peer.horizon),
    })
}
