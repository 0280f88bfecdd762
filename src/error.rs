//! Error types for the range cache
//!
//! The cache core never returns errors; these cover header parsing, upstream
//! fetches and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Range Cache Error Enum ==
/// Unified error type for the range cache and its proxy.
#[derive(Error, Debug)]
pub enum RangeCacheError {
    /// Malformed `Range` request header
    #[error("Invalid range header: {0}")]
    InvalidRange(String),

    /// Malformed `Content-Range` response header
    #[error("Invalid content range header: {0}")]
    InvalidContentRange(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream answered with something the proxy cannot relay
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Transport-level failure talking to the upstream
    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for RangeCacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            RangeCacheError::InvalidRange(_)
            | RangeCacheError::InvalidContentRange(_)
            | RangeCacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RangeCacheError::Upstream(_) | RangeCacheError::Http(_) => StatusCode::BAD_GATEWAY,
            RangeCacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the range cache.
pub type Result<T> = std::result::Result<T, RangeCacheError>;
