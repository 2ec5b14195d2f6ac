//! Common error types shared across crates.

use thiserror::Error;

/// Top-level API error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ApiError::BadRequest`] → 400
/// - [`ApiError::NotFound`] → 404
/// - [`ApiError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed — invalid JSON, bad checksum, or bad parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The requested task or resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The queue dispatcher is not running or temporarily unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::Unavailable(_) => 503,
            ApiError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for the error response body.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unavailable(_) => "service_unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// The caller-facing detail message, without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Unavailable(m)
            | ApiError::Internal(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ApiError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ApiError::Unavailable("x".into()).http_status(), 503);
        assert_eq!(ApiError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ApiError::BadRequest("invalid JSON in request body".into());
        assert!(e.to_string().contains("invalid JSON in request body"));
    }

    #[test]
    fn codes_and_messages() {
        let e = ApiError::NotFound("Task not found".into());
        assert_eq!(e.code(), "not_found");
        assert_eq!(e.message(), "Task not found");
    }
}
