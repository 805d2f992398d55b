use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::Money;
use crate::ValuationResult;

/// Intrinsic value relative to the market price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValuationVerdict {
    Undervalued,
    Overvalued,
}

impl std::fmt::Display for ValuationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValuationVerdict::Undervalued => write!(f, "Undervalued"),
            ValuationVerdict::Overvalued => write!(f, "Overvalued"),
        }
    }
}

/// Intrinsic price set against the quoted market price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketComparison {
    pub market_price: Money,
    pub intrinsic_price: Money,
    pub verdict: ValuationVerdict,
    /// (intrinsic - market) / market
    pub upside: Decimal,
}

/// Label an intrinsic value against the market price.
///
/// Strictly greater ⇒ `Undervalued`. Equality resolves to `Overvalued`:
/// a stock priced exactly at its estimate offers no margin of safety.
pub fn verdict(intrinsic_price: Money, market_price: Money) -> ValuationVerdict {
    if intrinsic_price > market_price {
        ValuationVerdict::Undervalued
    } else {
        ValuationVerdict::Overvalued
    }
}

/// Build the full market comparison. The market price must be positive.
pub fn compare_to_market(
    intrinsic_price: Money,
    market_price: Money,
) -> ValuationResult<MarketComparison> {
    if market_price <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "market_price".into(),
            reason: format!("Market price must be positive, got {market_price}"),
        });
    }
    Ok(MarketComparison {
        market_price,
        intrinsic_price,
        verdict: verdict(intrinsic_price, market_price),
        upside: intrinsic_price.safe_sub(market_price)?.safe_div(market_price)?,
    })
}

/// Total equity value divided across the shares outstanding.
pub fn implied_price_per_share(total_value: Money, shares_outstanding: Decimal) -> ValuationResult<Money> {
    if shares_outstanding <= Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "shares_outstanding".into(),
            reason: format!("Shares outstanding must be positive, got {shares_outstanding}"),
        });
    }
    total_value.safe_div(shares_outstanding)
}

/// Per-share value and market comparison when both figures are present.
///
/// Absent figures are not an error: the comparison is simply skipped and
/// the reason recorded in `warnings`.
pub(crate) fn optional_comparison(
    total_value: Money,
    shares_outstanding: Option<Decimal>,
    market_price: Option<Money>,
    warnings: &mut Vec<String>,
) -> ValuationResult<(Option<Money>, Option<MarketComparison>)> {
    let per_share = match shares_outstanding {
        Some(shares) => Some(implied_price_per_share(total_value, shares)?),
        None => None,
    };
    let comparison = match (per_share, market_price) {
        (Some(price), Some(market)) => Some(compare_to_market(price, market)?),
        (None, Some(_)) => {
            warnings.push(
                "Market price supplied without shares outstanding; market comparison skipped"
                    .into(),
            );
            None
        }
        _ => None,
    };
    Ok((per_share, comparison))
}
