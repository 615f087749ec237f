use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProformaError {
    /// One or more required form fields were left blank. Every missing
    /// field is listed so the caller can surface them all at once.
    #[error("Validation failed: missing required field(s): {}", missing.join(", "))]
    Validation { missing: Vec<String> },

    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ProformaError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ProformaError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ProformaError {
    fn from(e: serde_json::Error) -> Self {
        ProformaError::SerializationError(e.to_string())
    }
}
