pub mod comps;
pub mod dividend;
pub mod scenarios;
pub mod valuation;

use rust_decimal::Decimal;
use std::error::Error;

use valuekit_core::financials::FinancialSnapshot;
use valuekit_core::valuation::capm;

use crate::config::HouseAssumptions;
use crate::input;

/// A flag that must be present when no JSON input was given.
pub(crate) fn required<T>(value: Option<T>, flag: &str) -> Result<T, Box<dyn Error>> {
    value.ok_or_else(|| format!("--{flag} is required (or provide --input)").into())
}

/// Optional provider snapshot used to fill figures not given as flags.
pub(crate) fn load_snapshot(path: Option<&str>) -> Result<Option<FinancialSnapshot>, Box<dyn Error>> {
    match path {
        Some(p) => {
            let snap: FinancialSnapshot = input::file::read_structured(p)?;
            tracing::debug!(ticker = %snap.ticker, "loaded snapshot");
            Ok(Some(snap))
        }
        None => Ok(None),
    }
}

/// The explicit discount rate, or the CAPM cost of equity under the house
/// assumptions.
pub(crate) fn discount_rate_or_capm(
    explicit: Option<Decimal>,
    beta: Option<Decimal>,
    house: &HouseAssumptions,
) -> Result<Decimal, Box<dyn Error>> {
    if let Some(rate) = explicit {
        return Ok(rate);
    }
    if beta.is_none() {
        tracing::warn!(
            default_beta = %house.capm.default_beta,
            "no beta supplied; discounting at the default-beta cost of equity"
        );
    }
    Ok(capm::cost_of_equity(&house.capm, beta)?)
}
