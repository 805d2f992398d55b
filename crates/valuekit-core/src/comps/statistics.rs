use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::arithmetic::{checked_sum, CheckedArithmetic};
use crate::types::Multiple;
use crate::ValuationResult;

/// Descriptive statistics for one metric over the peers that report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    pub metric: String,
    pub mean: Multiple,
    /// Sample standard deviation (n − 1); zero with fewer than two values
    pub std_dev: Multiple,
    pub count: usize,
}

impl MetricStatistics {
    /// Build statistics from the non-missing values. `Ok(None)` when no peer
    /// reports the metric; an error when the sums or squared deviations
    /// leave the `Decimal` range.
    pub fn from_values(metric: &str, values: &[Multiple]) -> ValuationResult<Option<Self>> {
        if values.is_empty() {
            return Ok(None);
        }
        let count = values.len();
        let mean = checked_sum(values.iter().copied())?.safe_div(Decimal::from(count as i64))?;

        let std_dev = if count > 1 {
            let squares = values
                .iter()
                .map(|v| {
                    let diff = v.safe_sub(mean)?;
                    diff.safe_mul(diff)
                })
                .collect::<ValuationResult<Vec<Decimal>>>()?;
            let variance = checked_sum(squares)?.safe_div(Decimal::from((count - 1) as i64))?;
            sqrt_decimal(variance)
        } else {
            Decimal::ZERO
        };

        Ok(Some(MetricStatistics {
            metric: metric.to_string(),
            mean,
            std_dev,
            count,
        }))
    }

    /// (x − mean) / σ, or zero when the metric has no spread. `None` when
    /// the quotient leaves the `Decimal` range.
    pub fn z_score(&self, value: Multiple) -> Option<Decimal> {
        if self.std_dev.is_zero() {
            Some(Decimal::ZERO)
        } else {
            value.checked_sub(self.mean)?.checked_div(self.std_dev)
        }
    }
}

fn sqrt_decimal(value: Decimal) -> Decimal {
    if value <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    value.sqrt().unwrap_or(Decimal::ZERO)
}
