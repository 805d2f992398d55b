//! Dividend yield and payout-ratio sustainability flags.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationResult;

/// Payout above this share of earnings is flagged for monitoring.
pub const HIGH_PAYOUT_THRESHOLD: Decimal = dec!(0.8);

/// Payout above this share of earnings exceeds what the company earns.
pub const UNSUSTAINABLE_PAYOUT_THRESHOLD: Decimal = Decimal::ONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutRating {
    /// Payout ratio at or below 80%
    Sustainable,
    /// Above 80% of earnings; monitor
    High,
    /// Dividends exceed earnings
    Unsustainable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutInput {
    /// Annual dividend per share
    pub dividend_rate: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_ratio: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutAssessment {
    /// Trailing dividend yield = dividend / price
    pub dividend_yield: Option<Rate>,
    pub payout_ratio: Option<Rate>,
    pub rating: Option<PayoutRating>,
}

/// Rate a payout ratio against the sustainability thresholds.
pub fn rate_payout(payout_ratio: Rate) -> PayoutRating {
    if payout_ratio > UNSUSTAINABLE_PAYOUT_THRESHOLD {
        PayoutRating::Unsustainable
    } else if payout_ratio > HIGH_PAYOUT_THRESHOLD {
        PayoutRating::High
    } else {
        PayoutRating::Sustainable
    }
}

/// Yield and payout rating from whichever figures are available.
pub fn assess_payout(input: &PayoutInput, warnings: &mut Vec<String>) -> ValuationResult<PayoutAssessment> {
    if input.dividend_rate < Decimal::ZERO {
        return Err(ValuationError::InvalidInput {
            field: "dividend_rate".into(),
            reason: "Dividend rate must be non-negative".into(),
        });
    }

    let dividend_yield = match input.current_price {
        Some(price) if price > Decimal::ZERO => Some(input.dividend_rate.safe_div(price)?),
        Some(price) => {
            warnings.push(format!("Non-positive price ({price}); dividend yield not computed"));
            None
        }
        None => None,
    };

    let rating = input.payout_ratio.map(rate_payout);
    match rating {
        Some(PayoutRating::Unsustainable) => warnings.push(
            "Dividend payout exceeds earnings; the dividend may be unsustainable".into(),
        ),
        Some(PayoutRating::High) => {
            warnings.push("High payout ratio; monitor dividend sustainability".into())
        }
        _ => {}
    }

    Ok(PayoutAssessment {
        dividend_yield,
        payout_ratio: input.payout_ratio,
        rating,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rate_payout_thresholds() {
        assert_eq!(rate_payout(dec!(0.45)), PayoutRating::Sustainable);
        assert_eq!(rate_payout(dec!(0.80)), PayoutRating::Sustainable);
        assert_eq!(rate_payout(dec!(0.85)), PayoutRating::High);
        assert_eq!(rate_payout(dec!(1.00)), PayoutRating::High);
        assert_eq!(rate_payout(dec!(1.20)), PayoutRating::Unsustainable);
    }

    #[test]
    fn test_assess_payout_yield() {
        let mut warnings = Vec::new();
        let input = PayoutInput {
            dividend_rate: dec!(3),
            current_price: Some(dec!(60)),
            payout_ratio: Some(dec!(0.5)),
        };
        let out = assess_payout(&input, &mut warnings).unwrap();
        assert_eq!(out.dividend_yield, Some(dec!(0.05)));
        assert_eq!(out.rating, Some(PayoutRating::Sustainable));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_assess_payout_missing_figures() {
        let mut warnings = Vec::new();
        let input = PayoutInput {
            dividend_rate: dec!(3),
            current_price: None,
            payout_ratio: None,
        };
        let out = assess_payout(&input, &mut warnings).unwrap();
        assert!(out.dividend_yield.is_none());
        assert!(out.rating.is_none());
    }

    #[test]
    fn test_assess_payout_warns_when_unsustainable() {
        let mut warnings = Vec::new();
        let input = PayoutInput {
            dividend_rate: dec!(3),
            current_price: Some(dec!(60)),
            payout_ratio: Some(dec!(1.3)),
        };
        assess_payout(&input, &mut warnings).unwrap();
        assert!(warnings[0].contains("exceeds earnings"));
    }
}
