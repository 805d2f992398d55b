use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::arithmetic::{checked_sum, CheckedArithmetic};
use crate::error::ValuationError;
use crate::time_value::{check_discount_rate, compound_factor, present_value};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, ProjectionPeriod, Rate};
use crate::ValuationResult;

use super::capm::{calculate_capm, CapmInput};
use super::market::{optional_comparison, MarketComparison};
use super::projection::{project_cash_flows, CashFlowSeries, DEFAULT_HORIZON};
use super::terminal::{TerminalAssumption, TerminalValue};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a free-cash-flow DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// Latest (Year 0) free cash flow
    pub base_fcf: Money,
    /// Constant annual growth over the explicit horizon
    pub growth_rate: Rate,
    /// Explicit forecast years (default 5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon: Option<u32>,
    /// Discount rate (WACC). Ignored when `capm` is provided.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// Derive the discount rate from CAPM instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capm: Option<CapmInput>,
    /// Terminal value strategy
    pub terminal: TerminalAssumption,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_price: Option<Money>,
    #[serde(default)]
    pub currency: Currency,
}

/// One explicit forecast year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfYearProjection {
    pub period: ProjectionPeriod,
    pub cash_flow: Money,
    pub discount_factor: Decimal,
    pub present_value: Money,
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfOutput {
    pub projections: Vec<DcfYearProjection>,
    pub terminal_value: TerminalValue,
    /// Sum of present values of the explicit-period cash flows
    pub pv_of_cash_flows: Money,
    pub pv_of_terminal: Money,
    /// Intrinsic value = PV(cash flows) + PV(terminal value)
    pub intrinsic_value: Money,
    /// PV of terminal value as a share of intrinsic value
    pub terminal_value_pct: Rate,
    pub discount_rate_used: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_price_per_share: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_comparison: Option<MarketComparison>,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Present value of a projected series plus a terminal value valued as of
/// its final period:
///
/// PV = Σ CF_i / (1+r)^i + TV / (1+r)^n
pub fn discounted_value(
    series: &CashFlowSeries,
    terminal_value: Money,
    discount_rate: Rate,
) -> ValuationResult<Money> {
    check_discount_rate(discount_rate)?;
    if series.is_empty() {
        return Err(ValuationError::assumption(
            "horizon",
            "Cash-flow series is empty; terminal value has no period to be discounted from",
        ));
    }

    let pv_flows = present_value(discount_rate, &series.flows)?;
    let compounded = compound_factor(discount_rate, series.len() as u32)?;

    pv_flows.safe_add(terminal_value.safe_div(compounded)?)
}

/// Project, value the terminal period and discount in one step.
///
/// Each call is a full recomputation; the sensitivity grid and peer
/// comparison use this for every cell or company.
pub fn dcf_value(
    base_fcf: Money,
    growth_rate: Rate,
    horizon: u32,
    terminal: &TerminalAssumption,
    discount_rate: Rate,
) -> ValuationResult<Money> {
    let series = project_cash_flows(base_fcf, growth_rate, horizon)?;
    let last = series.last().ok_or_else(|| {
        ValuationError::assumption("horizon", "Projection horizon must be at least one year")
    })?;
    let tv = terminal.terminal_value(last, discount_rate)?;
    discounted_value(&series, tv.value, discount_rate)
}

/// Run a single-stage-growth FCF DCF valuation with breakdown and warnings.
pub fn calculate_dcf(input: &DcfInput) -> ValuationResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Resolve discount rate ---
    let discount_rate = resolve_discount_rate(input, &mut warnings)?;
    check_discount_rate(discount_rate)?;

    let horizon = input.horizon.unwrap_or(DEFAULT_HORIZON);
    if horizon == 0 {
        return Err(ValuationError::assumption(
            "horizon",
            "Projection horizon must be at least one year",
        ));
    }

    tracing::debug!(
        base_fcf = %input.base_fcf,
        growth = %input.growth_rate,
        %discount_rate,
        horizon,
        "running DCF"
    );

    if input.base_fcf < Decimal::ZERO {
        warnings.push(format!(
            "Base free cash flow is negative ({}); projected flows and terminal value carry the sign",
            input.base_fcf
        ));
    }
    if input.growth_rate > dec!(0.30) {
        warnings.push(format!(
            "Growth rate of {} exceeds 30% for every projected year; review assumption",
            input.growth_rate
        ));
    }

    // --- Project cash flows ---
    let series = project_cash_flows(input.base_fcf, input.growth_rate, horizon)?;
    let projections = build_projections(&series, discount_rate)?;
    let pv_of_cash_flows = checked_sum(projections.iter().map(|p| p.present_value))?;

    // --- Terminal value ---
    let last = series.last().ok_or_else(|| {
        ValuationError::assumption("horizon", "Projection horizon must be at least one year")
    })?;
    let terminal_value = input.terminal.terminal_value(last, discount_rate)?;

    let intrinsic_value = discounted_value(&series, terminal_value.value, discount_rate)?;
    let pv_of_terminal = intrinsic_value.safe_sub(pv_of_cash_flows)?;

    let terminal_value_pct = if intrinsic_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_of_terminal.safe_div(intrinsic_value)?
    };
    if terminal_value_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of intrinsic value; consider extending the explicit forecast period",
            terminal_value_pct.safe_mul(dec!(100))?
        ));
    }

    // --- Per-share and market comparison ---
    let (implied_price_per_share, market_comparison) = optional_comparison(
        intrinsic_value,
        input.shares_outstanding,
        input.market_price,
        &mut warnings,
    )?;

    let output = DcfOutput {
        projections,
        terminal_value,
        pv_of_cash_flows,
        pv_of_terminal,
        intrinsic_value,
        terminal_value_pct,
        discount_rate_used: discount_rate,
        implied_price_per_share,
        market_comparison,
        currency: input.currency.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCF DCF (constant growth, end-of-year discounting)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn resolve_discount_rate(input: &DcfInput, warnings: &mut Vec<String>) -> ValuationResult<Rate> {
    if let Some(ref capm_input) = input.capm {
        let capm_out = calculate_capm(capm_input)?;
        for w in &capm_out.warnings {
            warnings.push(format!("[CAPM] {w}"));
        }
        Ok(capm_out.result.cost_of_equity)
    } else {
        input.discount_rate.ok_or_else(|| ValuationError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Provide either discount_rate or capm".into(),
        })
    }
}

fn build_projections(
    series: &CashFlowSeries,
    discount_rate: Rate,
) -> ValuationResult<Vec<DcfYearProjection>> {
    check_discount_rate(discount_rate)?;
    let one_plus_r = Decimal::ONE.safe_add(discount_rate)?;
    let mut compounded = Decimal::ONE;
    let mut projections = Vec::with_capacity(series.len());

    for (idx, cf) in series.flows.iter().enumerate() {
        compounded = compounded.safe_mul(one_plus_r)?;
        projections.push(DcfYearProjection {
            period: ProjectionPeriod::explicit(idx as u32 + 1),
            cash_flow: *cf,
            discount_factor: Decimal::ONE.safe_div(compounded)?,
            present_value: cf.safe_div(compounded)?,
        });
    }

    Ok(projections)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::capm::CapmAssumptions;
    use crate::valuation::market::ValuationVerdict;
    use crate::valuation::terminal::TerminalMethod;
    use rust_decimal_macros::dec;

    fn approx_eq(a: Decimal, b: Decimal, eps: Decimal) -> bool {
        (a - b).abs() < eps
    }

    fn sample_dcf_input() -> DcfInput {
        DcfInput {
            base_fcf: dec!(100),
            growth_rate: dec!(0.10),
            horizon: None,
            discount_rate: Some(dec!(0.10)),
            capm: None,
            terminal: TerminalAssumption::GordonGrowth {
                terminal_growth: dec!(0.02),
            },
            shares_outstanding: Some(dec!(10)),
            market_price: Some(dec!(150)),
            currency: Currency::USD,
        }
    }

    #[test]
    fn test_discounted_value_end_to_end() {
        let series = project_cash_flows(dec!(100), dec!(0.10), 5).unwrap();
        let tv = dec!(2053.40025);
        let pv = discounted_value(&series, tv, dec!(0.10)).unwrap();
        // Each explicit flow discounts to exactly 100; TV / 1.61051 = 1275
        assert!(approx_eq(pv, dec!(1775), dec!(0.0001)), "got {pv}");
    }

    #[test]
    fn test_discounted_value_rejects_empty_series() {
        let series = project_cash_flows(dec!(100), dec!(0.10), 0).unwrap();
        let err = discounted_value(&series, dec!(1000), dec!(0.10)).unwrap_err();
        assert!(err.is_invalid_assumption());
    }

    #[test]
    fn test_discounted_value_rejects_rate_at_minus_one() {
        let series = project_cash_flows(dec!(100), dec!(0.10), 3).unwrap();
        assert!(discounted_value(&series, dec!(1000), dec!(-1)).is_err());
        assert!(discounted_value(&series, dec!(1000), dec!(-2)).is_err());
    }

    #[test]
    fn test_dcf_value_gordon_invalid_when_growth_equals_rate() {
        let terminal = TerminalAssumption::GordonGrowth {
            terminal_growth: dec!(0.10),
        };
        let err = dcf_value(dec!(100), dec!(0.10), 5, &terminal, dec!(0.10)).unwrap_err();
        assert!(err.is_invalid_assumption());
    }

    #[test]
    fn test_dcf_value_overflow_is_an_error() {
        let terminal = TerminalAssumption::GordonGrowth {
            terminal_growth: dec!(0.0999999999999999999999),
        };
        let err = dcf_value(dec!(1_000_000_000), dec!(0.05), 5, &terminal, dec!(0.10)).unwrap_err();
        assert!(err.is_invalid_assumption());

        let mut input = sample_dcf_input();
        input.discount_rate = Some(dec!(-0.999));
        input.horizon = Some(12);
        input.terminal = TerminalAssumption::ExitMultiple {
            multiple: dec!(10),
        };
        assert!(calculate_dcf(&input).unwrap_err().is_invalid_assumption());
    }

    #[test]
    fn test_basic_dcf() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        let out = &result.result;

        assert_eq!(out.projections.len(), 5);
        assert_eq!(out.projections[0].cash_flow, dec!(110));
        assert_eq!(out.projections[4].period.label, "Year 5");
        assert_eq!(out.terminal_value.method, TerminalMethod::GordonGrowth);
        assert_eq!(out.terminal_value.value, dec!(2053.40025));
        assert!(approx_eq(out.pv_of_cash_flows, dec!(500), dec!(0.0001)));
        assert!(approx_eq(out.intrinsic_value, dec!(1775), dec!(0.0001)));
        assert!(approx_eq(out.pv_of_terminal, dec!(1275), dec!(0.0001)));
        assert_eq!(out.discount_rate_used, dec!(0.10));
    }

    #[test]
    fn test_dcf_market_comparison() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        let out = &result.result;
        let per_share = out.implied_price_per_share.unwrap();
        assert!(approx_eq(per_share, dec!(177.5), dec!(0.0001)));
        let cmp = out.market_comparison.as_ref().unwrap();
        assert_eq!(cmp.verdict, ValuationVerdict::Undervalued);
    }

    #[test]
    fn test_dcf_exit_multiple() {
        let mut input = sample_dcf_input();
        input.terminal = TerminalAssumption::ExitMultiple {
            multiple: dec!(12),
        };
        let out = calculate_dcf(&input).unwrap().result;
        assert_eq!(out.terminal_value.value, dec!(161.051) * dec!(12));
        // 500 + 12 * 100
        assert!(approx_eq(out.intrinsic_value, dec!(1700), dec!(0.0001)));
    }

    #[test]
    fn test_dcf_terminal_growth_exceeds_rate() {
        let mut input = sample_dcf_input();
        input.terminal = TerminalAssumption::GordonGrowth {
            terminal_growth: dec!(0.12),
        };
        assert!(calculate_dcf(&input).is_err());
    }

    #[test]
    fn test_dcf_requires_a_discount_rate() {
        let mut input = sample_dcf_input();
        input.discount_rate = None;
        assert!(matches!(
            calculate_dcf(&input),
            Err(ValuationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_dcf_with_capm() {
        let mut input = sample_dcf_input();
        input.discount_rate = Some(dec!(0.50)); // ignored
        input.capm = Some(CapmInput {
            beta: Some(dec!(1.2)),
            assumptions: CapmAssumptions::default(),
        });
        let out = calculate_dcf(&input).unwrap().result;
        assert_eq!(out.discount_rate_used, dec!(0.099));
    }

    #[test]
    fn test_dcf_zero_horizon_rejected() {
        let mut input = sample_dcf_input();
        input.horizon = Some(0);
        let err = calculate_dcf(&input).unwrap_err();
        assert!(err.is_invalid_assumption());
    }

    #[test]
    fn test_dcf_negative_fcf_warns_and_carries_sign() {
        let mut input = sample_dcf_input();
        input.base_fcf = dec!(-100);
        input.shares_outstanding = None;
        input.market_price = None;
        let result = calculate_dcf(&input).unwrap();
        assert!(result.result.intrinsic_value < Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("negative")));
    }

    #[test]
    fn test_dcf_terminal_share_warning() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        // 1275 / 1775 ≈ 71.8%, below the threshold
        assert!(result.result.terminal_value_pct < dec!(0.75));
        assert!(!result.warnings.iter().any(|w| w.contains("Terminal value represents")));

        let mut input = sample_dcf_input();
        input.terminal = TerminalAssumption::GordonGrowth {
            terminal_growth: dec!(0.05),
        };
        let result = calculate_dcf(&input).unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("Terminal value represents")));
    }

    #[test]
    fn test_dcf_methodology() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        assert_eq!(
            result.methodology,
            "FCF DCF (constant growth, end-of-year discounting)"
        );
    }
}
