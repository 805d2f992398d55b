pub mod arithmetic;
pub mod error;
pub mod financials;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "dividend_policy")]
pub mod dividend_policy;

#[cfg(feature = "comps")]
pub mod comps;

#[cfg(feature = "scenarios")]
pub mod scenarios;

pub use error::ValuationError;
pub use types::*;

/// Standard result type for all valuekit operations
pub type ValuationResult<T> = Result<T, ValuationError>;
