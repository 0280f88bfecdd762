//! Cache Statistics Module
//!
//! Tracks lookup outcomes and housekeeping counters.

use serde::Serialize;

// == Cache Stats ==
/// Observability counters for a [`RangeCache`](crate::cache::RangeCache).
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups served from cache (exact or coalesced)
    pub hits: u64,
    /// Lookups that fell through to the network
    pub misses: u64,
    /// Subset of `hits` that needed more than one entry
    pub coalesced_hits: u64,
    /// Entries removed to make room
    pub evictions: u64,
    /// Entries dropped because they outlived the expiry window
    pub expired: u64,
    /// Entries dropped because the origin reported a different content length
    pub invalidations: u64,
    /// Current number of stored ranges
    pub total_entries: usize,
    /// Current number of distinct keys
    pub total_keys: usize,
    /// Current number of stored bytes
    pub total_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_coalesced_hit(&mut self) {
        self.hits += 1;
        self.coalesced_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expired(&mut self, count: usize) {
        self.expired += count as u64;
    }

    pub fn record_invalidated(&mut self, count: usize) {
        self.invalidations += count as u64;
    }
}
