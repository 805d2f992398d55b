//! Side-by-side DCF of several companies under one set of house assumptions.
//!
//! Every company is valued twice (Gordon growth and exit multiple) with the
//! same growth, discount rate and terminal parameters. A company whose data
//! is missing or whose valuation fails gets a row carrying the error; the
//! remaining rows are unaffected.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::financials::FinancialSnapshot;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ValuationResult;

use super::dcf::dcf_value;
use super::market::{implied_price_per_share, verdict, ValuationVerdict};
use super::projection::DEFAULT_HORIZON;
use super::terminal::TerminalAssumption;

/// Maximum companies compared when the caller sets no limit.
pub const DEFAULT_MAX_COMPANIES: usize = 5;

/// Assumptions applied uniformly to every company. Fields left out when
/// deserialising keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerDcfAssumptions {
    pub growth_rate: Rate,
    pub discount_rate: Rate,
    pub terminal_growth: Rate,
    pub exit_multiple: Multiple,
    pub horizon: u32,
}

impl Default for PeerDcfAssumptions {
    fn default() -> Self {
        PeerDcfAssumptions {
            growth_rate: dec!(0.10),
            discount_rate: dec!(0.10),
            terminal_growth: dec!(0.02),
            exit_multiple: dec!(12),
            horizon: DEFAULT_HORIZON,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDcfInput {
    pub companies: Vec<FinancialSnapshot>,
    #[serde(default)]
    pub assumptions: PeerDcfAssumptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_companies: Option<usize>,
}

/// One company's comparison row. Fields are `None` where the figure could
/// not be computed; `error` explains a row that failed outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDcfRow {
    pub ticker: String,
    pub market_price: Option<Money>,
    pub intrinsic_gordon: Option<Money>,
    pub intrinsic_exit_multiple: Option<Money>,
    pub verdict_gordon: Option<ValuationVerdict>,
    pub verdict_exit_multiple: Option<ValuationVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDcfOutput {
    /// Rows in input order
    pub rows: Vec<PeerDcfRow>,
    pub companies_valued: usize,
    pub companies_failed: usize,
}

/// Value each company under the shared assumptions.
pub fn compare_peer_dcf(input: &PeerDcfInput) -> ValuationResult<ComputationOutput<PeerDcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.companies.is_empty() {
        return Err(ValuationError::InvalidInput {
            field: "companies".into(),
            reason: "At least one company is required".into(),
        });
    }

    let limit = input.max_companies.unwrap_or(DEFAULT_MAX_COMPANIES);
    if input.companies.len() > limit {
        warnings.push(format!(
            "{} companies supplied; only the first {limit} are compared",
            input.companies.len()
        ));
    }

    let rows: Vec<PeerDcfRow> = input
        .companies
        .iter()
        .take(limit)
        .map(|snap| match value_company(snap, &input.assumptions) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(ticker = %snap.ticker, error = %e, "peer valuation failed");
                warnings.push(format!("{}: {e}", snap.ticker));
                failed_row(snap, e)
            }
        })
        .collect();

    let companies_failed = rows.iter().filter(|r| r.error.is_some()).count();
    let output = PeerDcfOutput {
        companies_valued: rows.len() - companies_failed,
        companies_failed,
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Peer DCF comparison (Gordon growth and exit multiple)",
        &input.assumptions,
        warnings,
        elapsed,
        output,
    ))
}

fn value_company(snap: &FinancialSnapshot, a: &PeerDcfAssumptions) -> ValuationResult<PeerDcfRow> {
    let fcf = snap.require_fcf()?;

    let gordon = TerminalAssumption::GordonGrowth {
        terminal_growth: a.terminal_growth,
    };
    let exit = TerminalAssumption::ExitMultiple {
        multiple: a.exit_multiple,
    };
    let value_gordon = dcf_value(fcf, a.growth_rate, a.horizon, &gordon, a.discount_rate)?;
    let value_exit = dcf_value(fcf, a.growth_rate, a.horizon, &exit, a.discount_rate)?;

    let per_share = |total: Money| -> ValuationResult<Option<Money>> {
        snap.shares_outstanding
            .map(|shares| implied_price_per_share(total, shares))
            .transpose()
    };
    let intrinsic_gordon = per_share(value_gordon)?;
    let intrinsic_exit_multiple = per_share(value_exit)?;

    let market_price = snap.current_price.filter(|p| *p > Decimal::ZERO);
    let label = |intrinsic: Option<Money>| match (intrinsic, market_price) {
        (Some(v), Some(p)) => Some(verdict(v, p)),
        _ => None,
    };

    Ok(PeerDcfRow {
        ticker: snap.ticker.clone(),
        market_price,
        verdict_gordon: label(intrinsic_gordon),
        verdict_exit_multiple: label(intrinsic_exit_multiple),
        intrinsic_gordon,
        intrinsic_exit_multiple,
        error: None,
    })
}

fn failed_row(snap: &FinancialSnapshot, error: ValuationError) -> PeerDcfRow {
    PeerDcfRow {
        ticker: snap.ticker.clone(),
        market_price: snap.current_price,
        intrinsic_gordon: None,
        intrinsic_exit_multiple: None,
        verdict_gordon: None,
        verdict_exit_multiple: None,
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn snapshot(ticker: &str, fcf: Option<Decimal>, price: Option<Decimal>) -> FinancialSnapshot {
        FinancialSnapshot {
            ticker: ticker.into(),
            latest_fcf: fcf,
            current_price: price,
            shares_outstanding: Some(dec!(10)),
            ..Default::default()
        }
    }

    #[test]
    fn test_peer_rows_in_input_order() {
        let input = PeerDcfInput {
            companies: vec![
                snapshot("AAA", Some(dec!(100)), Some(dec!(150))),
                snapshot("BBB", Some(dec!(100)), Some(dec!(200))),
            ],
            assumptions: PeerDcfAssumptions::default(),
            max_companies: None,
        };
        let out = compare_peer_dcf(&input).unwrap().result;
        assert_eq!(out.rows[0].ticker, "AAA");
        assert_eq!(out.rows[1].ticker, "BBB");

        // Gordon: 1775 / 10 = 177.5; exit 12x: 1700 / 10 = 170
        let a = &out.rows[0];
        assert!((a.intrinsic_gordon.unwrap() - dec!(177.5)).abs() < dec!(0.0001));
        assert!((a.intrinsic_exit_multiple.unwrap() - dec!(170)).abs() < dec!(0.0001));
        assert_eq!(a.verdict_gordon, Some(ValuationVerdict::Undervalued));
        assert_eq!(out.rows[1].verdict_gordon, Some(ValuationVerdict::Overvalued));
    }

    #[test]
    fn test_missing_fcf_isolated_to_its_row() {
        let input = PeerDcfInput {
            companies: vec![
                snapshot("AAA", Some(dec!(100)), Some(dec!(150))),
                snapshot("NOFCF", None, Some(dec!(20))),
                snapshot("CCC", Some(dec!(50)), None),
            ],
            assumptions: PeerDcfAssumptions::default(),
            max_companies: None,
        };
        let result = compare_peer_dcf(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.companies_valued, 2);
        assert_eq!(out.companies_failed, 1);
        assert!(out.rows[1].error.is_some());
        assert!(out.rows[1].intrinsic_gordon.is_none());
        // No market price: value computed, verdict missing
        assert!(out.rows[2].intrinsic_gordon.is_some());
        assert!(out.rows[2].verdict_gordon.is_none());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_invalid_assumption_fails_every_row_without_aborting() {
        let input = PeerDcfInput {
            companies: vec![snapshot("AAA", Some(dec!(100)), Some(dec!(150)))],
            assumptions: PeerDcfAssumptions {
                terminal_growth: dec!(0.10),
                ..PeerDcfAssumptions::default()
            },
            max_companies: None,
        };
        let out = compare_peer_dcf(&input).unwrap().result;
        assert_eq!(out.companies_failed, 1);
    }

    #[test]
    fn test_company_limit() {
        let companies = (0..7)
            .map(|i| snapshot(&format!("T{i}"), Some(dec!(10)), None))
            .collect();
        let input = PeerDcfInput {
            companies,
            assumptions: PeerDcfAssumptions::default(),
            max_companies: None,
        };
        let result = compare_peer_dcf(&input).unwrap();
        assert_eq!(result.result.rows.len(), DEFAULT_MAX_COMPANIES);
        assert!(result.warnings[0].contains("only the first 5"));
    }

    #[test]
    fn test_empty_company_list_rejected() {
        let input = PeerDcfInput {
            companies: vec![],
            assumptions: PeerDcfAssumptions::default(),
            max_companies: None,
        };
        assert!(compare_peer_dcf(&input).is_err());
    }
}
