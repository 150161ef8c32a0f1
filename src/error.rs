//! Unified SDK error types.

use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Business-rule failure reported by the backend in an otherwise
    /// successful response. The message is the backend's, verbatim.
    #[error("{0}")]
    Backend(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("{0}")]
    Other(String),
}

/// HTTP-layer errors.
#[derive(Error, Debug)]
pub enum HttpError {
    #[cfg(feature = "http")]
    #[error("Request failed: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Timeout")]
    Timeout,

    /// 2xx with a body that is not JSON.
    #[error("Malformed response: {0}")]
    BadResponse(String),

    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token request failed: {0}")]
    LoginFailed(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl SdkError {
    /// Whether this error came from the transport rather than the backend's
    /// business logic. Transport failures are retryable by re-triggering.
    pub fn is_transport(&self) -> bool {
        matches!(self, SdkError::Http(_) | SdkError::Stream(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_verbatim() {
        let err = SdkError::Backend("계산 실패".to_string());
        assert_eq!(err.to_string(), "계산 실패");
        assert!(!err.is_transport());
    }

    #[test]
    fn test_http_error_converts_and_is_transport() {
        let err: SdkError = HttpError::Timeout.into();
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "HTTP error: Timeout");
    }
}
