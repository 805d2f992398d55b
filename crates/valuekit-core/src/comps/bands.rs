use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Multiple;

/// Multiples below this read as cheap on a generic screen.
pub const LOW_MULTIPLE_THRESHOLD: Decimal = dec!(15);

/// Multiples above this read as expensive on a generic screen.
pub const HIGH_MULTIPLE_THRESHOLD: Decimal = dec!(25);

/// Coarse, sector-agnostic band for a raw multiple. A display aid only;
/// relative attractiveness comes from the z-score ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleBand {
    Low,
    Mid,
    High,
}

pub fn classify_multiple(value: Multiple) -> MultipleBand {
    if value < LOW_MULTIPLE_THRESHOLD {
        MultipleBand::Low
    } else if value > HIGH_MULTIPLE_THRESHOLD {
        MultipleBand::High
    } else {
        MultipleBand::Mid
    }
}
