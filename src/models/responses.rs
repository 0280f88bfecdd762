//! Response DTOs for the caching proxy API
//!
//! Defines the structure of outgoing JSON bodies.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub coalesced_hits: u64,
    pub evictions: u64,
    pub expired: u64,
    pub invalidations: u64,
    /// Stored ranges across all keys
    pub total_entries: usize,
    pub total_keys: usize,
    pub total_bytes: usize,
    /// Configured byte capacity
    pub max_bytes: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, max_bytes: usize) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            coalesced_hits: stats.coalesced_hits,
            evictions: stats.evictions,
            expired: stats.expired,
            invalidations: stats.invalidations,
            total_entries: stats.total_entries,
            total_keys: stats.total_keys,
            total_bytes: stats.total_bytes,
            max_bytes,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for `POST /preload`
#[derive(Debug, Clone, Serialize)]
pub struct PreloadResponse {
    pub url: String,
    pub requested_bytes: u64,
    /// Ranges held for the URL once the preload finished
    pub cached_ranges: Vec<(u64, u64)>,
}

/// Response body for `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Removed {} cached ranges", removed),
            removed,
        }
    }
}

/// Response body for `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
