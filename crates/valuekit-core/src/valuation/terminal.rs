use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::arithmetic::CheckedArithmetic;
use crate::error::ValuationError;
use crate::types::{Money, Multiple, Rate};
use crate::ValuationResult;

/// How the value beyond the explicit horizon is estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalMethod {
    /// Gordon growth perpetuity: TV = CF_n * (1+g) / (r - g)
    GordonGrowth,
    /// Exit multiple: TV = CF_n * multiple
    ExitMultiple,
}

/// A terminal-value strategy together with its single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TerminalAssumption {
    GordonGrowth { terminal_growth: Rate },
    ExitMultiple { multiple: Multiple },
}

impl TerminalAssumption {
    pub fn method(&self) -> TerminalMethod {
        match self {
            TerminalAssumption::GordonGrowth { .. } => TerminalMethod::GordonGrowth,
            TerminalAssumption::ExitMultiple { .. } => TerminalMethod::ExitMultiple,
        }
    }

    /// Terminal value as of the last projected period.
    pub fn terminal_value(
        &self,
        last_cash_flow: Money,
        discount_rate: Rate,
    ) -> ValuationResult<TerminalValue> {
        let value = match *self {
            TerminalAssumption::GordonGrowth { terminal_growth } => {
                terminal_value_gordon(last_cash_flow, terminal_growth, discount_rate)?
            }
            TerminalAssumption::ExitMultiple { multiple } => {
                terminal_value_exit_multiple(last_cash_flow, multiple)?
            }
        };
        Ok(TerminalValue {
            method: self.method(),
            value,
        })
    }
}

/// Worth of all flows beyond the horizon, tagged with the strategy used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalValue {
    pub method: TerminalMethod,
    pub value: Money,
}

/// Gordon growth terminal value.
///
/// The perpetuity only converges when the discount rate strictly exceeds
/// the terminal growth rate; otherwise the formula yields a negative or
/// infinite figure, so the call fails with `InvalidAssumption`. A spread
/// so narrow that the value leaves the `Decimal` range fails the same way.
pub fn terminal_value_gordon(
    last_cash_flow: Money,
    terminal_growth: Rate,
    discount_rate: Rate,
) -> ValuationResult<Money> {
    if discount_rate <= terminal_growth {
        return Err(ValuationError::assumption(
            "terminal_growth",
            format!(
                "Discount rate ({discount_rate}) must exceed terminal growth rate ({terminal_growth}) for the Gordon growth model"
            ),
        ));
    }
    let spread = discount_rate.safe_sub(terminal_growth)?;
    last_cash_flow
        .safe_mul(Decimal::ONE.safe_add(terminal_growth)?)?
        .safe_div(spread)
}

/// Exit-multiple terminal value. The multiple must be positive.
pub fn terminal_value_exit_multiple(
    last_cash_flow: Money,
    multiple: Multiple,
) -> ValuationResult<Money> {
    if multiple <= Decimal::ZERO {
        return Err(ValuationError::assumption(
            "exit_multiple",
            format!("Exit multiple must be positive, got {multiple}"),
        ));
    }
    last_cash_flow.safe_mul(multiple)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gordon_value() {
        let tv = terminal_value_gordon(dec!(161.051), dec!(0.02), dec!(0.10)).unwrap();
        assert_eq!(tv, dec!(2053.40025));
    }

    #[test]
    fn test_gordon_rejects_growth_equal_to_rate() {
        let err = terminal_value_gordon(dec!(100), dec!(0.08), dec!(0.08)).unwrap_err();
        assert!(err.is_invalid_assumption());
    }

    #[test]
    fn test_gordon_rejects_growth_above_rate() {
        assert!(terminal_value_gordon(dec!(100), dec!(0.12), dec!(0.08)).is_err());
    }

    #[test]
    fn test_gordon_grows_as_spread_narrows() {
        let wide = terminal_value_gordon(dec!(100), dec!(0.07), dec!(0.08)).unwrap();
        let narrow = terminal_value_gordon(dec!(100), dec!(0.0799), dec!(0.08)).unwrap();
        let narrower = terminal_value_gordon(dec!(100), dec!(0.079999), dec!(0.08)).unwrap();
        assert!(wide < narrow && narrow < narrower);
        assert!(narrower > dec!(100_000_000));
    }

    #[test]
    fn test_gordon_vanishing_spread_is_an_error() {
        let err = terminal_value_gordon(
            dec!(1_000_000_000),
            dec!(0.0999999999999999999999),
            dec!(0.10),
        )
        .unwrap_err();
        assert!(err.is_invalid_assumption());
        assert!(err.to_string().contains("out of representable range"));
    }

    #[test]
    fn test_exit_multiple_linear() {
        let single = terminal_value_exit_multiple(dec!(161.051), dec!(6)).unwrap();
        let double = terminal_value_exit_multiple(dec!(161.051), dec!(12)).unwrap();
        assert_eq!(double, single * dec!(2));
    }

    #[test]
    fn test_exit_multiple_rejects_non_positive() {
        assert!(terminal_value_exit_multiple(dec!(100), Decimal::ZERO).is_err());
        assert!(terminal_value_exit_multiple(dec!(100), dec!(-3)).is_err());
    }

    #[test]
    fn test_assumption_dispatch() {
        let gordon = TerminalAssumption::GordonGrowth {
            terminal_growth: dec!(0.02),
        };
        let tv = gordon.terminal_value(dec!(100), dec!(0.10)).unwrap();
        assert_eq!(tv.method, TerminalMethod::GordonGrowth);
        assert_eq!(tv.value, dec!(1275));

        let exit = TerminalAssumption::ExitMultiple {
            multiple: dec!(12),
        };
        let tv = exit.terminal_value(dec!(100), dec!(0.10)).unwrap();
        assert_eq!(tv.method, TerminalMethod::ExitMultiple);
        assert_eq!(tv.value, dec!(1200));
    }

    #[test]
    fn test_assumption_serde_tag() {
        let parsed: TerminalAssumption =
            serde_json::from_str(r#"{"method":"exit_multiple","multiple":"12"}"#).unwrap();
        assert_eq!(
            parsed,
            TerminalAssumption::ExitMultiple {
                multiple: dec!(12)
            }
        );
    }
}
