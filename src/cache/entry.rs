//! Cache Entry Module
//!
//! One contiguous byte range of a resource, with the metadata needed for
//! expiry and eviction.

use std::time::{Duration, Instant};

use bytes::Bytes;

// == Cache Entry ==
/// A stored byte range `[range_start, range_end]` (inclusive).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored bytes, exactly `range_end - range_start + 1` long
    pub data: Bytes,
    /// First byte offset covered
    pub range_start: u64,
    /// Last byte offset covered (inclusive)
    pub range_end: u64,
    /// Total size of the resource as reported by the origin
    pub content_length: u64,
    /// Creation instant
    pub timestamp: Instant,
    /// Origin validator, carried but not checked
    pub etag: Option<String>,
    /// Insertion counter, orders entries created at the same instant
    pub sequence: u64,
}

impl CacheEntry {
    // == Length ==
    /// Number of stored bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // == Is Expired ==
    /// Checks if the entry has outlived the expiry window.
    ///
    /// Boundary condition: an entry exactly `expiry` old is expired.
    pub fn is_expired(&self, now: Instant, expiry: Duration) -> bool {
        now.saturating_duration_since(self.timestamp) >= expiry
    }

    // == Contains ==
    /// Returns true if `[start, end]` lies entirely inside this entry.
    pub fn contains(&self, start: u64, end: u64) -> bool {
        self.range_start <= start && end <= self.range_end
    }

    // == Overlaps ==
    /// Returns true if `[start, end]` shares at least one byte with this entry.
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        !(self.range_end < start || self.range_start > end)
    }

    // == Slice ==
    /// Returns the inclusive sub-range `[start, end]` of the resource.
    ///
    /// The caller must have checked [`CacheEntry::contains`]; returns `None`
    /// otherwise.
    pub fn slice(&self, start: u64, end: u64) -> Option<Bytes> {
        if start > end || !self.contains(start, end) {
            return None;
        }
        let from = usize::try_from(start - self.range_start).ok()?;
        let to = usize::try_from(end - self.range_start).ok()?;
        if to >= self.data.len() {
            return None;
        }
        Some(self.data.slice(from..=to))
    }
}
