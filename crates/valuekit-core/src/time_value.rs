use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationResult;

/// Reject discount rates at or below -100%, where (1 + r) stops being a
/// meaningful growth factor.
pub fn check_discount_rate(rate: Rate) -> ValuationResult<()> {
    if rate <= dec!(-1) {
        return Err(ValuationError::assumption(
            "discount_rate",
            format!("Discount rate must be greater than -100%, got {rate}"),
        ));
    }
    Ok(())
}

/// Growth factor (1 + r)^period for an integral period.
///
/// Computed by repeated multiplication so that exact decimal inputs give
/// exact results (no exp/ln approximation).
pub fn compound_factor(rate: Rate, period: u32) -> ValuationResult<Decimal> {
    check_discount_rate(rate)?;
    let one_plus_r = Decimal::ONE.safe_add(rate)?;
    let mut growth = Decimal::ONE;
    for _ in 0..period {
        growth = growth.safe_mul(one_plus_r)?;
    }
    Ok(growth)
}

/// Discount factor 1 / (1 + r)^period. Fails when the compounded factor
/// rounds to zero or leaves the representable range.
pub fn discount_factor(rate: Rate, period: u32) -> ValuationResult<Decimal> {
    Decimal::ONE.safe_div(compound_factor(rate, period)?)
}

/// Present value of a series where element `i` falls at the end of
/// period `i + 1`.
pub fn present_value(rate: Rate, flows: &[Money]) -> ValuationResult<Money> {
    check_discount_rate(rate)?;

    let one_plus_r = Decimal::ONE.safe_add(rate)?;
    let mut compounded = Decimal::ONE;
    let mut total = Decimal::ZERO;

    for cf in flows {
        compounded = compounded.safe_mul(one_plus_r)?;
        total = total.safe_add(cf.safe_div(compounded)?)?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_discount_factor_exact() {
        assert_eq!(discount_factor(dec!(0.10), 0).unwrap(), Decimal::ONE);
        assert_eq!(
            discount_factor(dec!(0.25), 2).unwrap(),
            dec!(0.64)
        );
    }

    #[test]
    fn test_present_value_end_of_period() {
        // 110 / 1.1 + 121 / 1.21 = 200
        let pv = present_value(dec!(0.10), &[dec!(110), dec!(121)]).unwrap();
        assert_eq!(pv, dec!(200));
    }

    #[test]
    fn test_present_value_empty() {
        assert_eq!(present_value(dec!(0.10), &[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_rate_at_minus_one_rejected() {
        let err = present_value(dec!(-1), &[dec!(100)]).unwrap_err();
        assert!(err.is_invalid_assumption());
        assert!(discount_factor(dec!(-1.5), 1).is_err());
    }

    #[test]
    fn test_negative_rate_above_minus_one_allowed() {
        // 100 / 0.5 = 200
        let pv = present_value(dec!(-0.5), &[dec!(100)]).unwrap();
        assert_eq!(pv, dec!(200));
    }

    #[test]
    fn test_compound_factor_exact() {
        assert_eq!(compound_factor(dec!(0.10), 5).unwrap(), dec!(1.61051));
    }

    #[test]
    fn test_rate_near_minus_one_fails_instead_of_panicking() {
        // 100 / 0.001^9 is already beyond the Decimal range
        let flows = [dec!(100); 10];
        let err = present_value(dec!(-0.999), &flows).unwrap_err();
        assert!(err.is_invalid_assumption());
        assert!(err.to_string().contains("out of representable range"));
        assert!(discount_factor(dec!(-0.999), 10).is_err());
    }

    #[test]
    fn test_large_rate_overflow_is_an_error() {
        assert!(compound_factor(dec!(1000), 20).is_err());
    }
}
