//! Request DTOs for the caching proxy API
//!
//! Defines the structure of incoming query strings and bodies.

use serde::Deserialize;
use url::Url;

/// Largest preload the API accepts (64 MiB).
pub const MAX_PRELOAD_BYTES: u64 = 64 * 1024 * 1024;

/// Query string of `GET /media`
#[derive(Debug, Clone, Deserialize)]
pub struct MediaQuery {
    /// Upstream URL to fetch through the cache
    pub url: String,
}

impl MediaQuery {
    /// Returns an error message if the URL is not an absolute http(s) URL.
    pub fn validate(&self) -> Option<String> {
        validate_upstream_url(&self.url)
    }
}

/// Request body for `POST /preload`
///
/// # Fields
/// - `url`: The media URL to warm
/// - `bytes`: How many leading bytes to fetch
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    pub url: String,
    pub bytes: u64,
}

impl PreloadRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if let Some(error) = validate_upstream_url(&self.url) {
            return Some(error);
        }
        if self.bytes == 0 {
            return Some("Preload size must be greater than zero".to_string());
        }
        if self.bytes > MAX_PRELOAD_BYTES {
            return Some(format!(
                "Preload size exceeds maximum of {} bytes",
                MAX_PRELOAD_BYTES
            ));
        }
        None
    }
}

fn validate_upstream_url(raw: &str) -> Option<String> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => None,
        Ok(url) => Some(format!("Unsupported URL scheme: {}", url.scheme())),
        Err(err) => Some(format!("Invalid URL '{}': {}", raw, err)),
    }
}
