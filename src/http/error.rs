//! API Error Types
//!
//! Every failure a caller of the request pipeline can observe. Token refresh
//! is handled inside the pipeline and only shows up here when it fails.

use thiserror::Error;

use super::transport::TransportError;
use crate::session::StoreError;

/// Request pipeline errors
///
/// Variants carry rendered messages so one failure can be handed to every
/// caller waiting on a shared request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No response was received
    #[error("Network connection failed: {0}")]
    Network(String),

    /// The request timed out
    #[error("Request timeout")]
    Timeout,

    /// Server answered with a non-success result code
    #[error("{message}")]
    Business { code: String, message: String },

    /// Refresh token rejected or missing; the session has been reset
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Token refresh failed; the deferred request was abandoned
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// Access token still rejected after a successful refresh
    #[error("Access token rejected after refresh")]
    Unauthorized,

    /// Non-success HTTP status without a result envelope
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Credential or cache storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Local file error (downloads)
    #[error("IO error: {0}")]
    Io(String),
}

impl ApiError {
    /// Whether the failure is an authentication problem rather than a
    /// business or transport one
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ApiError::SessionExpired(_) | ApiError::RefreshFailed(_) | ApiError::Unauthorized
        )
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ApiError::Timeout,
            TransportError::Connect(msg) | TransportError::Other(msg) => ApiError::Network(msg),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Io(err.to_string())
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
