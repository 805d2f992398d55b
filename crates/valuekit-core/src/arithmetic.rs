//! Checked `Decimal` arithmetic.
//!
//! `Decimal`'s operators panic when a result leaves the representable
//! range (about ±7.9e28) or when a divisor rounds to zero. Every formula
//! on caller-supplied figures goes through these methods instead, so an
//! extreme input becomes an `InvalidAssumption` error for that one
//! valuation.

use rust_decimal::Decimal;

use crate::error::ValuationError;
use crate::ValuationResult;

pub trait CheckedArithmetic: Sized {
    fn safe_add(self, rhs: Self) -> ValuationResult<Self>;
    fn safe_sub(self, rhs: Self) -> ValuationResult<Self>;
    fn safe_mul(self, rhs: Self) -> ValuationResult<Self>;
    fn safe_div(self, rhs: Self) -> ValuationResult<Self>;
}

impl CheckedArithmetic for Decimal {
    #[inline]
    fn safe_add(self, rhs: Self) -> ValuationResult<Self> {
        self.checked_add(rhs)
            .ok_or_else(|| out_of_range(format!("{self} + {rhs}")))
    }

    #[inline]
    fn safe_sub(self, rhs: Self) -> ValuationResult<Self> {
        self.checked_sub(rhs)
            .ok_or_else(|| out_of_range(format!("{self} - {rhs}")))
    }

    #[inline]
    fn safe_mul(self, rhs: Self) -> ValuationResult<Self> {
        self.checked_mul(rhs)
            .ok_or_else(|| out_of_range(format!("{self} * {rhs}")))
    }

    #[inline]
    fn safe_div(self, rhs: Self) -> ValuationResult<Self> {
        if rhs.is_zero() {
            return Err(out_of_range(format!("{self} / 0 (divisor rounded to zero)")));
        }
        self.checked_div(rhs)
            .ok_or_else(|| out_of_range(format!("{self} / {rhs}")))
    }
}

/// Sum a sequence, failing on the first overflow.
pub fn checked_sum<I>(values: I) -> ValuationResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.safe_add(v))
}

fn out_of_range(expression: String) -> ValuationError {
    ValuationError::assumption(
        "arithmetic",
        format!("{expression} is out of representable range"),
    )
}
