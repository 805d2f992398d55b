use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::arithmetic::CheckedArithmetic;
use crate::types::{Money, Rate};
use crate::ValuationResult;

/// Explicit forecast horizon used when the caller does not choose one.
pub const DEFAULT_HORIZON: u32 = 5;

/// Projected cash flows; element 0 is period 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowSeries {
    pub flows: Vec<Money>,
}

impl CashFlowSeries {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Cash flow of the final projected period.
    pub fn last(&self) -> Option<Money> {
        self.flows.last().copied()
    }
}

/// Compound `base` forward at a constant rate: period i = base * (1 + g)^i.
///
/// The growth rate is not clamped and a negative base keeps its sign.
/// A zero horizon yields an empty series, which the discounting engine
/// rejects. Compounding past the `Decimal` range is an `InvalidAssumption`.
pub fn project_cash_flows(
    base: Money,
    growth_rate: Rate,
    horizon: u32,
) -> ValuationResult<CashFlowSeries> {
    let factor = Decimal::ONE.safe_add(growth_rate)?;
    let mut current = base;
    let mut flows = Vec::with_capacity(horizon as usize);
    for _ in 0..horizon {
        current = current.safe_mul(factor)?;
        flows.push(current);
    }
    Ok(CashFlowSeries { flows })
}
