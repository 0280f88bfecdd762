//! Configuration Module
//!
//! Handles loading cache and proxy configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default byte capacity of the cache (100 MiB)
pub const DEFAULT_MAX_BYTES: usize = 100 * 1024 * 1024;
/// Default ceiling on stored ranges
pub const DEFAULT_MAX_ENTRIES: usize = 50;
/// Default expiry window in seconds (30 minutes)
pub const DEFAULT_EXPIRY_SECS: u64 = 30 * 60;

// == Cache Config ==
/// Parameters of a single [`RangeCache`](crate::cache::RangeCache).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Byte capacity; eviction runs before any store that would exceed it
    pub max_bytes: usize,
    /// Maximum number of stored ranges across all keys
    pub max_entries: usize,
    /// Entries at least this old are treated as absent
    pub expiry: Duration,
    /// Whether lookups may stitch several entries together
    pub coalescing_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_entries: DEFAULT_MAX_ENTRIES,
            expiry: Duration::from_secs(DEFAULT_EXPIRY_SECS),
            coalescing_enabled: true,
        }
    }
}

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Byte capacity of the cache
    pub max_cache_bytes: usize,
    /// Maximum number of stored ranges
    pub max_entries: usize,
    /// Expiry window in seconds
    pub expiry_secs: u64,
    /// Range coalescing toggle
    pub coalescing_enabled: bool,
    /// HTTP server port
    pub server_port: u16,
    /// Background purge interval in seconds
    pub cleanup_interval: u64,
    /// Upstream request timeout in seconds
    pub request_timeout: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_BYTES` - Cache capacity in bytes (default: 104857600)
    /// - `MAX_ENTRIES` - Maximum stored ranges (default: 50)
    /// - `EXPIRY_SECS` - Expiry window in seconds (default: 1800)
    /// - `COALESCING_ENABLED` - Range coalescing on/off (default: true)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 60)
    /// - `REQUEST_TIMEOUT` - Upstream timeout in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_cache_bytes: env_or("MAX_CACHE_BYTES", defaults.max_cache_bytes),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            expiry_secs: env_or("EXPIRY_SECS", defaults.expiry_secs),
            coalescing_enabled: env_or("COALESCING_ENABLED", defaults.coalescing_enabled),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            request_timeout: env_or("REQUEST_TIMEOUT", defaults.request_timeout),
        }
    }

    /// Builds the cache parameters out of this configuration.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_bytes: self.max_cache_bytes,
            max_entries: self.max_entries,
            expiry: Duration::from_secs(self.expiry_secs),
            coalescing_enabled: self.coalescing_enabled,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_cache_bytes: DEFAULT_MAX_BYTES,
            max_entries: DEFAULT_MAX_ENTRIES,
            expiry_secs: DEFAULT_EXPIRY_SECS,
            coalescing_enabled: true,
            server_port: 3000,
            cleanup_interval: 60,
            request_timeout: 30,
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
