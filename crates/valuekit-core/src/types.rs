use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 12x FCF, 8.5x EV/EBITDA)
pub type Multiple = Decimal;

/// Reporting currency. Carried through to outputs as a label only; no
/// conversion is ever performed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    CHF,
    JPY,
    CAD,
    AUD,
    HKD,
    SGD,
    #[serde(untagged)]
    Other(String),
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Other(code) => write!(f, "{code}"),
            known => write!(f, "{known:?}"),
        }
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "GBP" => Currency::GBP,
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            "CHF" => Currency::CHF,
            "JPY" => Currency::JPY,
            "CAD" => Currency::CAD,
            "AUD" => Currency::AUD,
            "HKD" => Currency::HKD,
            "SGD" => Currency::SGD,
            other => Currency::Other(other.to_string()),
        }
    }
}

/// A single period in a financial projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionPeriod {
    pub year: u32,
    pub label: String,
    pub is_terminal: bool,
}

impl ProjectionPeriod {
    pub fn explicit(year: u32) -> Self {
        ProjectionPeriod {
            year,
            label: format!("Year {year}"),
            is_terminal: false,
        }
    }
}

/// A swept input: values from `min` to `max` in `step` increments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_label_round_trip() {
        assert_eq!(Currency::from("usd"), Currency::USD);
        assert_eq!(Currency::from("BRL"), Currency::Other("BRL".into()));
        assert_eq!(Currency::from("BRL").to_string(), "BRL");
        assert_eq!(Currency::EUR.to_string(), "EUR");
    }

    #[test]
    fn test_currency_deserialises_unknown_codes() {
        let known: Currency = serde_json::from_str("\"JPY\"").unwrap();
        assert_eq!(known, Currency::JPY);
        let other: Currency = serde_json::from_str("\"INR\"").unwrap();
        assert_eq!(other, Currency::Other("INR".into()));
    }
}
