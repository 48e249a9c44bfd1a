//! Mapping of HTTP transport failures onto `AppError`.
//!
//! Rate limiting, server errors, timeouts and connection failures are
//! transient; any other non-success status is a permanent provider failure.
//! A provider 4xx (bad key, unknown model) maps to `AppError::Llm`, not
//! `InvalidInput`.

use placement_core::AppError;
use reqwest::StatusCode;

/// Classify a non-success HTTP status returned by a provider.
pub fn status_error(provider: &str, status: StatusCode, body: &str) -> AppError {
    let message = format!("{} API error ({}): {}", provider, status, body);
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        AppError::Unavailable(message)
    } else {
        AppError::Llm(message)
    }
}

/// Classify an error raised while sending a request or reading its body.
pub fn request_error(provider: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Timeout(format!("{} request timed out: {}", provider, err))
    } else if err.is_connect() || err.is_request() || err.is_body() {
        AppError::Unavailable(format!("Failed to reach {}: {}", provider, err))
    } else if err.is_decode() {
        AppError::Llm(format!("Failed to parse {} response: {}", provider, err))
    } else {
        AppError::Unavailable(format!("{} request failed: {}", provider, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        for status in [
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(status_error("Gemini", status, "").is_transient());
        }
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let bad = status_error("Gemini", StatusCode::BAD_REQUEST, "bad prompt");
        assert!(matches!(bad, AppError::Llm(_)));
        assert!(!bad.is_transient());
        assert_eq!(bad.status_code(), 500);

        let unprocessable = status_error("Gemini", StatusCode::UNPROCESSABLE_ENTITY, "");
        assert!(matches!(unprocessable, AppError::Llm(_)));

        let denied = status_error("Gemini", StatusCode::FORBIDDEN, "key revoked");
        assert!(matches!(denied, AppError::Llm(_)));
        assert!(!denied.is_transient());
    }
}
