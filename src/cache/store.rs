//! Range Cache Store Module
//!
//! Main cache engine: per-key range storage with lazy expiry, coalescing
//! lookups and global oldest-first eviction under a byte budget.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::cache::{coalesce, CacheEntry, CacheKey, CacheStats, Clock, SystemClock};
use crate::config::CacheConfig;

// == Range Hit ==
/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeHit {
    /// The requested bytes
    pub data: Bytes,
    /// First byte offset served
    pub start: u64,
    /// Last byte offset served (inclusive, resolved for open-ended requests)
    pub end: u64,
    /// Total size of the resource
    pub content_length: u64,
    /// Validator of the stored bytes, when every entry used agrees on one
    pub etag: Option<String>,
    /// Whether the bytes were stitched from more than one entry
    pub coalesced: bool,
}

// == Range Cache ==
/// In-memory byte-range cache.
///
/// All operations are synchronous. Share it across tasks behind a single lock.
#[derive(Debug)]
pub struct RangeCache {
    /// Stored ranges per key, non-overlapping within a key
    entries: HashMap<CacheKey, Vec<CacheEntry>>,
    /// Sum of all stored entry lengths
    total_bytes: usize,
    /// Number of stored entries across all keys
    entry_count: usize,
    /// Performance statistics
    stats: CacheStats,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    next_sequence: u64,
}

impl RangeCache {
    // == Constructor ==
    /// Creates an empty cache that reads the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty cache with an explicit time source.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            total_bytes: 0,
            entry_count: 0,
            stats: CacheStats::new(),
            config,
            clock,
            next_sequence: 0,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    // == Find Cached Range ==
    /// Returns the bytes `[start, end]` of `url` if the cache can serve them.
    ///
    /// `end == None` means "to the end of the resource". A `None` return is a
    /// miss; the caller should fetch and then call [`RangeCache::store_range`].
    pub fn find_cached_range(&mut self, url: &str, start: u64, end: Option<u64>) -> Option<Bytes> {
        self.lookup(url, start, end).map(|hit| hit.data)
    }

    // == Lookup ==
    /// Same as [`RangeCache::find_cached_range`] but keeps the hit metadata.
    pub fn lookup(&mut self, url: &str, start: u64, end: Option<u64>) -> Option<RangeHit> {
        let key = CacheKey::normalize(url);
        self.drop_expired(&key);

        let hit = self
            .entries
            .get(&key)
            .and_then(|entries| find_hit(entries, start, end, self.config.coalescing_enabled));

        match &hit {
            Some(hit) if hit.coalesced => {
                self.stats.record_coalesced_hit();
                debug!(key = %key, start, end = hit.end, "coalesced cache hit");
            }
            Some(hit) => {
                self.stats.record_hit();
                debug!(key = %key, start, end = hit.end, "cache hit");
            }
            None => {
                self.stats.record_miss();
                debug!(key = %key, start, ?end, "cache miss");
            }
        }

        hit
    }

    // == Store Range ==
    /// Stores the inclusive range `[range_start, range_end]` of `url`.
    ///
    /// Never fails. Existing entries for the key that overlap the new range
    /// are replaced first, then eviction runs until the new bytes fit.
    /// A range larger than the whole capacity empties the cache and is still
    /// inserted.
    pub fn store_range(
        &mut self,
        url: &str,
        data: Bytes,
        range_start: u64,
        range_end: u64,
        content_length: u64,
        etag: Option<String>,
    ) {
        let expected_len = range_end.checked_sub(range_start).and_then(|d| d.checked_add(1));
        if expected_len != Some(data.len() as u64) {
            warn!(
                url,
                range_start,
                range_end,
                len = data.len(),
                "range does not match buffer length, not caching"
            );
            return;
        }

        let key = CacheKey::normalize(url);
        self.invalidate_on_length_change(&key, content_length);
        let replaced = self.remove_overlapping(&key, range_start, range_end);

        let len = data.len();
        while self.needs_room_for(len) {
            if !self.evict_oldest() {
                break;
            }
        }

        let timestamp = self.clock.now();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.entries.entry(key.clone()).or_default().push(CacheEntry {
            data,
            range_start,
            range_end,
            content_length,
            timestamp,
            etag,
            sequence,
        });
        self.total_bytes += len;
        self.entry_count += 1;

        debug!(
            key = %key,
            range_start,
            range_end,
            replaced,
            total_bytes = self.total_bytes,
            "stored range"
        );
    }

    // == Evict Oldest ==
    /// Removes the oldest entry across all keys.
    ///
    /// Returns false if the cache was already empty.
    pub fn evict_oldest(&mut self) -> bool {
        let oldest = self
            .entries
            .iter()
            .flat_map(|(key, entries)| {
                entries
                    .iter()
                    .enumerate()
                    .map(move |(index, entry)| ((entry.timestamp, entry.sequence), key, index))
            })
            .min_by_key(|(order, _, _)| *order)
            .map(|(_, key, index)| (key.clone(), index));

        let Some((key, index)) = oldest else {
            return false;
        };

        if let Some(entries) = self.entries.get_mut(&key) {
            let evicted = entries.swap_remove(index);
            if entries.is_empty() {
                self.entries.remove(&key);
            }
            self.total_bytes -= evicted.len();
            self.entry_count -= 1;
            self.stats.record_eviction();
            debug!(
                key = %key,
                range_start = evicted.range_start,
                range_end = evicted.range_end,
                "evicted range"
            );
        }

        true
    }

    // == Purge Expired ==
    /// Physically removes every expired entry.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let keys: Vec<CacheKey> = self.entries.keys().cloned().collect();
        keys.iter().map(|key| self.drop_expired(key)).sum()
    }

    // == Remove ==
    /// Drops every range stored for `url`.
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, url: &str) -> usize {
        self.remove_key(&CacheKey::normalize(url))
    }

    // == Clear ==
    /// Empties the cache. Counters are kept.
    pub fn clear(&mut self) -> usize {
        let removed = self.entry_count;
        self.entries.clear();
        self.total_bytes = 0;
        self.entry_count = 0;
        removed
    }

    // == Ranges ==
    /// Returns the stored intervals for `url`, sorted by start.
    ///
    /// Expired entries that have not been purged yet are included.
    pub fn ranges(&self, url: &str) -> Vec<(u64, u64)> {
        let mut ranges: Vec<(u64, u64)> = self
            .entries
            .get(&CacheKey::normalize(url))
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.range_start, entry.range_end))
                    .collect()
            })
            .unwrap_or_default();
        ranges.sort_unstable();
        ranges
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entry_count;
        stats.total_keys = self.entries.len();
        stats.total_bytes = self.total_bytes;
        stats
    }

    /// Returns the number of stored ranges.
    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    // == Internal Helpers ==

    fn needs_room_for(&self, len: usize) -> bool {
        self.entry_count > 0
            && (self.total_bytes + len > self.config.max_bytes
                || self.entry_count >= self.config.max_entries)
    }

    /// Drops the key's expired entries. Returns how many were dropped.
    fn drop_expired(&mut self, key: &CacheKey) -> usize {
        let now = self.clock.now();
        let expiry = self.config.expiry;

        let Some(entries) = self.entries.get_mut(key) else {
            return 0;
        };

        let before_len = entries.len();
        let mut dropped_bytes = 0;
        entries.retain(|entry| {
            if entry.is_expired(now, expiry) {
                dropped_bytes += entry.len();
                false
            } else {
                true
            }
        });
        let dropped = before_len - entries.len();
        if entries.is_empty() {
            self.entries.remove(key);
        }

        if dropped > 0 {
            self.total_bytes -= dropped_bytes;
            self.entry_count -= dropped;
            self.stats.record_expired(dropped);
            debug!(key = %key, dropped, "dropped expired ranges");
        }
        dropped
    }

    /// Drops the key's entries overlapping `[start, end]`. Returns how many.
    fn remove_overlapping(&mut self, key: &CacheKey, start: u64, end: u64) -> usize {
        let Some(entries) = self.entries.get_mut(key) else {
            return 0;
        };

        let before_len = entries.len();
        let mut replaced_bytes = 0;
        entries.retain(|existing| {
            if existing.overlaps(start, end) {
                replaced_bytes += existing.len();
                false
            } else {
                true
            }
        });
        let replaced = before_len - entries.len();
        if entries.is_empty() {
            self.entries.remove(key);
        }

        self.total_bytes -= replaced_bytes;
        self.entry_count -= replaced;
        replaced
    }

    fn remove_key(&mut self, key: &CacheKey) -> usize {
        let Some(entries) = self.entries.remove(key) else {
            return 0;
        };
        self.total_bytes -= entries.iter().map(CacheEntry::len).sum::<usize>();
        self.entry_count -= entries.len();
        entries.len()
    }

    /// Drops the key's ranges if the origin now reports a different size.
    fn invalidate_on_length_change(&mut self, key: &CacheKey, content_length: u64) {
        let changed = self.entries.get(key).is_some_and(|entries| {
            entries
                .iter()
                .any(|entry| entry.content_length != content_length)
        });
        if changed {
            let removed = self.remove_key(key);
            self.stats.record_invalidated(removed);
            info!(
                key = %key,
                content_length,
                removed,
                "content length changed, invalidated cached ranges"
            );
        }
    }
}

/// Exact containment first, then coalescing for closed ranges.
fn find_hit(
    entries: &[CacheEntry],
    start: u64,
    end: Option<u64>,
    coalescing_enabled: bool,
) -> Option<RangeHit> {
    let exact = entries.iter().find_map(|entry| {
        let requested_end = match end {
            Some(end) => end,
            None => entry.content_length.checked_sub(1)?,
        };
        entry.slice(start, requested_end).map(|data| RangeHit {
            data,
            start,
            end: requested_end,
            content_length: entry.content_length,
            etag: entry.etag.clone(),
            coalesced: false,
        })
    });
    if exact.is_some() {
        return exact;
    }

    let end = end?;
    if !coalescing_enabled {
        return None;
    }
    let content_length = entries.first()?.content_length;
    coalesce(entries, start, end).map(|data| RangeHit {
        data,
        start,
        end,
        content_length,
        etag: shared_etag(entries),
        coalesced: true,
    })
}

fn shared_etag(entries: &[CacheEntry]) -> Option<String> {
    let first = entries.first()?.etag.as_ref()?;
    entries
        .iter()
        .all(|entry| entry.etag.as_ref() == Some(first))
        .then(|| first.clone())
}
