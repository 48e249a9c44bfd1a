//! Error types for the placement assistant.
//!
//! A single error enum covers configuration, I/O, provider, knowledge and
//! prompt failures. Provider failures are split into transient
//! (`Unavailable`, `Timeout`) and permanent (`InvalidInput`, `Llm`) so that
//! callers can decide whether a retry makes sense, and so the request
//! boundary can pick the right status code.

use thiserror::Error;

/// Unified error type for the placement assistant.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Permanent LLM or embedding provider errors (bad request, malformed reply)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Transient provider failure: rate limiting, 5xx, connection reset
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A provider call or a whole request exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Missing or invalid request fields, or a reply that failed validation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Knowledge base, ingestion and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Unavailable(_) | AppError::Timeout(_))
    }

    /// HTTP status a request boundary should answer with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::InvalidInput(_) => 400,
            AppError::Unavailable(_) | AppError::Timeout(_) => 503,
            _ => 500,
        }
    }

    /// Short user-facing message matching `status_code()`.
    pub fn public_message(&self) -> &'static str {
        match self.status_code() {
            400 => "Invalid request",
            503 => "Service temporarily unavailable. Please try again in a few moments.",
            _ => "An unexpected error occurred",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Unavailable("429".to_string()).is_transient());
        assert!(AppError::Timeout("30s".to_string()).is_transient());
        assert!(!AppError::InvalidInput("empty".to_string()).is_transient());
        assert!(!AppError::Llm("bad request".to_string()).is_transient());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::InvalidInput("x".to_string()).status_code(), 400);
        assert_eq!(AppError::Unavailable("x".to_string()).status_code(), 503);
        assert_eq!(AppError::Timeout("x".to_string()).status_code(), 503);
        assert_eq!(AppError::Knowledge("x".to_string()).status_code(), 500);
        assert!(AppError::Timeout("x".to_string())
            .public_message()
            .starts_with("Service temporarily unavailable"));
    }
}
