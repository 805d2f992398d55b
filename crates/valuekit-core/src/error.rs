use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    /// A modelling precondition does not hold (e.g. discount rate at or below growth).
    #[error("Invalid assumption: {field} — {reason}")]
    InvalidAssumption { field: String, reason: String },

    /// An expected figure was not supplied by the data provider.
    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ValuationError {
    pub(crate) fn assumption(field: &str, reason: impl Into<String>) -> Self {
        ValuationError::InvalidAssumption {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for precondition failures, as opposed to absent data.
    pub fn is_invalid_assumption(&self) -> bool {
        matches!(self, ValuationError::InvalidAssumption { .. })
    }
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::SerializationError(e.to_string())
    }
}
