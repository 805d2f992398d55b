//! Dividend Discount Model.
//!
//! Two forms:
//! 1. **Single-stage** (Gordon growth on dividends): V = D₀(1+g) / (r − g).
//! 2. **Multi-stage**: an explicit high-growth phase of `years` dividends,
//!    followed by a Gordon terminal value at the end of that phase.
//!
//! Both require the discount rate to exceed the perpetual growth rate and
//! report `InvalidAssumption` otherwise.
//!
//! All arithmetic uses checked `rust_decimal::Decimal` operations. No `f64`.
//! A dividend path that compounds past the `Decimal` range is an
//! `InvalidAssumption`, not a panic.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::time_value::check_discount_rate;
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::valuation::market::{compare_to_market, MarketComparison};
use crate::ValuationResult;

use super::payout::{assess_payout, PayoutAssessment, PayoutInput};

/// Terminal-phase years appended to the projected dividend path.
pub const TERMINAL_PATH_YEARS: u32 = 5;

const MAX_HIGH_GROWTH_YEARS: u32 = 200;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Growth structure of the dividend stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DdmModel {
    /// Constant growth forever.
    SingleStage { growth_rate: Rate },
    /// `high_growth_years` at `high_growth_rate`, then `terminal_growth` forever.
    MultiStage {
        high_growth_rate: Rate,
        high_growth_years: u32,
        terminal_growth: Rate,
    },
}

/// Input for a DDM valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdmInput {
    /// Current annual dividend per share (D₀).
    pub dividend: Money,
    /// Required rate of return.
    pub discount_rate: Rate,
    pub model: DdmModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_price: Option<Money>,
    /// Dividends / earnings, for the sustainability check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_ratio: Option<Rate>,
    #[serde(default)]
    pub currency: Currency,
}

/// Year-by-year dividend detail of the explicit phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearDetail {
    /// Year number (1-indexed).
    pub year: u32,
    pub dividend: Money,
    pub discount_factor: Decimal,
    pub pv: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DividendPhase {
    HighGrowth,
    Terminal,
}

/// A point on the projected dividend path (for charting).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendPathPoint {
    pub year: u32,
    pub dividend: Money,
    pub phase: DividendPhase,
}

/// Output of the DDM valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdmOutput {
    /// Intrinsic value per share.
    pub intrinsic_value: Money,
    /// Explicit-phase dividends (empty for single-stage).
    pub year_by_year: Vec<YearDetail>,
    /// Gordon terminal value at the end of the explicit phase, undiscounted.
    pub terminal_value: Money,
    pub pv_of_terminal: Money,
    /// PV of terminal value as a percentage of intrinsic value.
    pub terminal_pct: Decimal,
    /// Explicit-phase dividends followed by five terminal-growth years.
    pub dividend_path: Vec<DividendPathPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_comparison: Option<MarketComparison>,
    pub payout: PayoutAssessment,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Single-stage DDM: V = D₀(1+g) / (r − g).
pub fn ddm_single_stage(
    dividend: Money,
    growth_rate: Rate,
    discount_rate: Rate,
) -> ValuationResult<Money> {
    check_discount_rate(discount_rate)?;
    check_convergence(discount_rate, growth_rate, "growth_rate")?;
    dividend
        .safe_mul(Decimal::ONE.safe_add(growth_rate)?)?
        .safe_div(discount_rate.safe_sub(growth_rate)?)
}

/// Multi-stage DDM intrinsic value.
///
/// D_i = D₀(1+g₁)^i for i = 1..years; TV = D_years(1+g₂) / (r − g₂) at
/// year `years`; value = Σ D_i/(1+r)^i + TV/(1+r)^years.
pub fn ddm_multi_stage(
    dividend: Money,
    high_growth_rate: Rate,
    years: u32,
    terminal_growth: Rate,
    discount_rate: Rate,
) -> ValuationResult<Money> {
    let (_, pv_dividends, _, pv_terminal) =
        multi_stage_parts(dividend, high_growth_rate, years, terminal_growth, discount_rate)?;
    pv_dividends.safe_add(pv_terminal)
}

/// Run a DDM valuation with detail, payout assessment and market comparison.
pub fn calculate_ddm(input: &DdmInput) -> ValuationResult<ComputationOutput<DdmOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.dividend < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "dividend".into(),
            reason: "Current dividend must be non-negative.".into(),
        });
    }
    if input.dividend.is_zero() {
        warnings.push("Dividend is zero; the model values the stock at zero".into());
    }

    tracing::debug!(
        dividend = %input.dividend,
        discount_rate = %input.discount_rate,
        model = ?input.model,
        "running DDM"
    );

    let (intrinsic_value, year_by_year, terminal_value, pv_of_terminal, dividend_path, methodology) =
        match input.model {
            DdmModel::SingleStage { growth_rate } => {
                let value = ddm_single_stage(input.dividend, growth_rate, input.discount_rate)?;
                let path = extend_path(
                    input.dividend,
                    growth_rate,
                    0,
                    TERMINAL_PATH_YEARS,
                    DividendPhase::Terminal,
                )?;
                (
                    value,
                    Vec::new(),
                    value,
                    value,
                    path,
                    "Single-Stage Dividend Discount Model",
                )
            }
            DdmModel::MultiStage {
                high_growth_rate,
                high_growth_years,
                terminal_growth,
            } => {
                let (years, pv_dividends, tv, pv_tv) = multi_stage_parts(
                    input.dividend,
                    high_growth_rate,
                    high_growth_years,
                    terminal_growth,
                    input.discount_rate,
                )?;
                let last_dividend = years.last().map(|y| y.dividend).unwrap_or(input.dividend);
                let mut path: Vec<DividendPathPoint> = years
                    .iter()
                    .map(|y| DividendPathPoint {
                        year: y.year,
                        dividend: y.dividend,
                        phase: DividendPhase::HighGrowth,
                    })
                    .collect();
                path.extend(extend_path(
                    last_dividend,
                    terminal_growth,
                    high_growth_years,
                    TERMINAL_PATH_YEARS,
                    DividendPhase::Terminal,
                )?);
                (
                    pv_dividends.safe_add(pv_tv)?,
                    years,
                    tv,
                    pv_tv,
                    path,
                    "Multi-Stage Dividend Discount Model",
                )
            }
        };

    let terminal_pct = if intrinsic_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal.safe_div(intrinsic_value)?.safe_mul(dec!(100))?
    };

    let market_comparison = match input.market_price {
        Some(price) => Some(compare_to_market(intrinsic_value, price)?),
        None => None,
    };

    let payout = assess_payout(
        &PayoutInput {
            dividend_rate: input.dividend,
            current_price: input.market_price,
            payout_ratio: input.payout_ratio,
        },
        &mut warnings,
    )?;

    let output = DdmOutput {
        intrinsic_value,
        year_by_year,
        terminal_value,
        pv_of_terminal,
        terminal_pct,
        dividend_path,
        market_comparison,
        payout,
        currency: input.currency.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(methodology, input, warnings, elapsed, output))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// (explicit years, PV of explicit dividends, undiscounted TV, PV of TV)
fn multi_stage_parts(
    dividend: Money,
    high_growth_rate: Rate,
    years: u32,
    terminal_growth: Rate,
    discount_rate: Rate,
) -> ValuationResult<(Vec<YearDetail>, Money, Money, Money)> {
    check_discount_rate(discount_rate)?;
    if years == 0 {
        return Err(ValuationError::assumption(
            "high_growth_years",
            "High-growth phase must last at least one year",
        ));
    }
    if years > MAX_HIGH_GROWTH_YEARS {
        return Err(ValuationError::InvalidInput {
            field: "high_growth_years".into(),
            reason: format!("High-growth phase exceeds {MAX_HIGH_GROWTH_YEARS} years; likely an input error"),
        });
    }
    check_convergence(discount_rate, terminal_growth, "terminal_growth")?;

    let one_plus_r = Decimal::ONE.safe_add(discount_rate)?;
    let one_plus_g = Decimal::ONE.safe_add(high_growth_rate)?;
    let mut current_dividend = dividend;
    let mut compounded = Decimal::ONE;
    let mut pv_dividends = Decimal::ZERO;
    let mut detail = Vec::with_capacity(years as usize);

    for year in 1..=years {
        current_dividend = current_dividend.safe_mul(one_plus_g)?;
        compounded = compounded.safe_mul(one_plus_r)?;
        let pv = current_dividend.safe_div(compounded)?;
        pv_dividends = pv_dividends.safe_add(pv)?;
        detail.push(YearDetail {
            year,
            dividend: current_dividend,
            discount_factor: Decimal::ONE.safe_div(compounded)?,
            pv,
        });
    }

    let terminal_dividend = current_dividend.safe_mul(Decimal::ONE.safe_add(terminal_growth)?)?;
    let terminal_value = terminal_dividend.safe_div(discount_rate.safe_sub(terminal_growth)?)?;
    let pv_terminal = terminal_value.safe_div(compounded)?;

    Ok((detail, pv_dividends, terminal_value, pv_terminal))
}

fn check_convergence(discount_rate: Rate, growth: Rate, field: &str) -> ValuationResult<()> {
    if discount_rate <= growth {
        return Err(ValuationError::assumption(
            field,
            format!(
                "Discount rate ({discount_rate}) must exceed the perpetual growth rate ({growth}) for a convergent valuation"
            ),
        ));
    }
    Ok(())
}

fn extend_path(
    from: Money,
    growth: Rate,
    start_year: u32,
    years: u32,
    phase: DividendPhase,
) -> ValuationResult<Vec<DividendPathPoint>> {
    let factor = Decimal::ONE.safe_add(growth)?;
    let mut current = from;
    let mut path = Vec::with_capacity(years as usize);
    for i in 1..=years {
        current = current.safe_mul(factor)?;
        path.push(DividendPathPoint {
            year: start_year + i,
            dividend: current,
            phase,
        });
    }
    Ok(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::market::ValuationVerdict;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    fn multi_stage_input() -> DdmInput {
        DdmInput {
            dividend: dec!(2.00),
            discount_rate: dec!(0.09),
            model: DdmModel::MultiStage {
                high_growth_rate: dec!(0.08),
                high_growth_years: 5,
                terminal_growth: dec!(0.03),
            },
            market_price: Some(dec!(40)),
            payout_ratio: Some(dec!(0.55)),
            currency: Currency::USD,
        }
    }

    #[test]
    fn test_single_stage_value() {
        // 2 * 1.05 / (0.09 - 0.05) = 52.5
        let v = ddm_single_stage(dec!(2), dec!(0.05), dec!(0.09)).unwrap();
        assert_eq!(v, dec!(52.5));
    }

    #[test]
    fn test_single_stage_requires_rate_above_growth() {
        assert!(ddm_single_stage(dec!(2), dec!(0.09), dec!(0.09))
            .unwrap_err()
            .is_invalid_assumption());
        assert!(ddm_single_stage(dec!(2), dec!(0.10), dec!(0.09)).is_err());
    }

    #[test]
    fn test_multi_stage_one_year() {
        // D1 = 1.08, TV = 1.1124 / 0.06 = 18.54, PV = (1.08 + 18.54) / 1.09 = 18
        let v = ddm_multi_stage(dec!(1), dec!(0.08), 1, dec!(0.03), dec!(0.09)).unwrap();
        assert!(approx_eq(v, dec!(18), dec!(0.0000001)), "got {v}");
    }

    #[test]
    fn test_multi_stage_zero_years_invalid() {
        let err = ddm_multi_stage(dec!(1), dec!(0.08), 0, dec!(0.03), dec!(0.09)).unwrap_err();
        assert!(err.is_invalid_assumption());
    }

    #[test]
    fn test_multi_stage_overflow_is_an_error() {
        // 1.5^200 is far beyond the Decimal range; 200 years is still accepted
        let err = ddm_multi_stage(dec!(1), dec!(0.5), 200, dec!(0.03), dec!(0.09)).unwrap_err();
        assert!(err.is_invalid_assumption());
        assert!(err.to_string().contains("out of representable range"));

        let mut input = multi_stage_input();
        input.model = DdmModel::MultiStage {
            high_growth_rate: dec!(0.5),
            high_growth_years: 200,
            terminal_growth: dec!(0.03),
        };
        assert!(calculate_ddm(&input).unwrap_err().is_invalid_assumption());
    }

    #[test]
    fn test_long_high_growth_phase_within_range() {
        let v = ddm_multi_stage(dec!(1), dec!(0.05), 200, dec!(0.03), dec!(0.09)).unwrap();
        assert!(v > Decimal::ZERO);
    }

    #[test]
    fn test_multi_stage_discount_factor_matches_compounding() {
        let out = calculate_ddm(&multi_stage_input()).unwrap().result;
        let y2 = &out.year_by_year[1];
        assert_eq!(y2.discount_factor, Decimal::ONE / dec!(1.1881));
    }

    #[test]
    fn test_multi_stage_terminal_growth_at_rate_invalid() {
        assert!(ddm_multi_stage(dec!(1), dec!(0.08), 5, dec!(0.09), dec!(0.09)).is_err());
    }

    #[test]
    fn test_multi_stage_equal_growth_matches_single_stage() {
        // With g1 == g2 the two-stage model collapses to Gordon growth
        let single = ddm_single_stage(dec!(1.5), dec!(0.04), dec!(0.10)).unwrap();
        let multi = ddm_multi_stage(dec!(1.5), dec!(0.04), 7, dec!(0.04), dec!(0.10)).unwrap();
        assert!(approx_eq(single, multi, dec!(0.000001)), "{single} vs {multi}");
    }

    #[test]
    fn test_calculate_ddm_multi_stage_detail() {
        let result = calculate_ddm(&multi_stage_input()).unwrap();
        let out = &result.result;

        assert_eq!(out.year_by_year.len(), 5);
        assert_eq!(out.year_by_year[0].dividend, dec!(2.16));
        assert_eq!(out.dividend_path.len(), 10);
        assert_eq!(out.dividend_path[5].phase, DividendPhase::Terminal);
        assert_eq!(out.dividend_path[9].year, 10);

        let pv_sum: Decimal = out.year_by_year.iter().map(|y| y.pv).sum();
        assert!(approx_eq(
            out.intrinsic_value,
            pv_sum + out.pv_of_terminal,
            dec!(0.0000001)
        ));
        assert!(out.terminal_pct > dec!(50) && out.terminal_pct < dec!(100));
        assert_eq!(result.methodology, "Multi-Stage Dividend Discount Model");
    }

    #[test]
    fn test_calculate_ddm_verdict() {
        let out = calculate_ddm(&multi_stage_input()).unwrap().result;
        let cmp = out.market_comparison.unwrap();
        assert_eq!(cmp.verdict, ValuationVerdict::Undervalued);
    }

    #[test]
    fn test_calculate_ddm_single_stage() {
        let input = DdmInput {
            dividend: dec!(2),
            discount_rate: dec!(0.09),
            model: DdmModel::SingleStage {
                growth_rate: dec!(0.05),
            },
            market_price: Some(dec!(52.5)),
            payout_ratio: Some(dec!(0.9)),
            currency: Currency::USD,
        };
        let result = calculate_ddm(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.intrinsic_value, dec!(52.5));
        assert!(out.year_by_year.is_empty());
        assert_eq!(out.dividend_path.len(), 5);
        // Intrinsic equal to price resolves to Overvalued
        assert_eq!(
            out.market_comparison.as_ref().unwrap().verdict,
            ValuationVerdict::Overvalued
        );
        assert!(result.warnings.iter().any(|w| w.contains("High payout")));
    }

    #[test]
    fn test_calculate_ddm_negative_dividend_rejected() {
        let mut input = multi_stage_input();
        input.dividend = dec!(-1);
        assert!(calculate_ddm(&input).is_err());
    }
}
