use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::ValuationResult;

/// Market-wide assumptions for the CAPM discount rate.
///
/// Loaded once at startup and never mutated; every calculation that needs a
/// discount rate receives it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapmAssumptions {
    /// Risk-free rate (e.g. 10-year government bond yield)
    pub risk_free_rate: Rate,
    /// Expected long-term market return
    pub market_return: Rate,
    /// Beta used when the provider reports none
    #[serde(default = "default_beta")]
    pub default_beta: Decimal,
}

fn default_beta() -> Decimal {
    Decimal::ONE
}

impl Default for CapmAssumptions {
    fn default() -> Self {
        CapmAssumptions {
            risk_free_rate: dec!(0.045),
            market_return: dec!(0.09),
            default_beta: default_beta(),
        }
    }
}

impl CapmAssumptions {
    /// Market return minus the risk-free rate.
    pub fn equity_risk_premium(&self) -> Rate {
        self.market_return - self.risk_free_rate
    }
}

/// Input for a CAPM cost-of-equity calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapmInput {
    /// Levered equity beta; `None` falls back to the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    #[serde(default)]
    pub assumptions: CapmAssumptions,
}

/// Output of the CAPM calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapmOutput {
    /// Ke = Rf + Beta * (Rm - Rf), used as the discount rate
    pub cost_of_equity: Rate,
    pub beta_used: Decimal,
    /// True when the configured default beta stood in for a missing one
    pub beta_defaulted: bool,
    pub equity_risk_premium: Rate,
}

/// Cost of equity via CAPM: Ke = Rf + Beta * (Rm - Rf).
pub fn cost_of_equity(assumptions: &CapmAssumptions, beta: Option<Decimal>) -> ValuationResult<Rate> {
    let beta = beta.unwrap_or(assumptions.default_beta);
    validate(assumptions, beta)?;
    assumptions
        .risk_free_rate
        .safe_add(beta.safe_mul(assumptions.equity_risk_premium())?)
}

/// Run the CAPM calculation with warnings and metadata.
pub fn calculate_capm(input: &CapmInput) -> ValuationResult<ComputationOutput<CapmOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let assumptions = &input.assumptions;
    let beta_defaulted = input.beta.is_none();
    let beta_used = input.beta.unwrap_or(assumptions.default_beta);
    let cost_of_equity = cost_of_equity(assumptions, Some(beta_used))?;
    let equity_risk_premium = assumptions.equity_risk_premium();

    if beta_defaulted {
        warnings.push(format!(
            "Beta not available; using default beta of {beta_used}"
        ));
    }
    if beta_used > dec!(3.0) {
        warnings.push(format!(
            "High beta ({beta_used}): verify market data; betas above 3.0 are unusual"
        ));
    }
    if equity_risk_premium <= Decimal::ZERO {
        warnings.push(format!(
            "Market return ({}) does not exceed the risk-free rate ({}); equity risk premium is {equity_risk_premium}",
            assumptions.market_return, assumptions.risk_free_rate
        ));
    }
    if cost_of_equity > dec!(0.20) {
        warnings.push(format!(
            "Cost of equity of {cost_of_equity} exceeds 20%; appropriate for high-risk situations only"
        ));
    }

    tracing::debug!(%beta_used, %cost_of_equity, "CAPM cost of equity");

    let output = CapmOutput {
        cost_of_equity,
        beta_used,
        beta_defaulted,
        equity_risk_premium,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Cost of equity via CAPM",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate(assumptions: &CapmAssumptions, beta: Decimal) -> ValuationResult<()> {
    if assumptions.risk_free_rate < Decimal::ZERO {
        return Err(ValuationError::assumption(
            "risk_free_rate",
            "Risk-free rate cannot be negative",
        ));
    }
    if assumptions.market_return <= dec!(-1) {
        return Err(ValuationError::assumption(
            "market_return",
            "Market return must be greater than -100%",
        ));
    }
    if beta <= Decimal::ZERO {
        return Err(ValuationError::assumption("beta", "Beta must be positive"));
    }
    Ok(())
}
