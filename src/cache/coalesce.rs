//! Range Coalescing Module
//!
//! Synthesizes a requested range from several adjacent or overlapping entries.

use bytes::{Bytes, BytesMut};

use crate::cache::CacheEntry;

// == Coalesce ==
/// Builds `[start, end]` (inclusive) out of `entries`, or returns `None`.
///
/// Coverage must be total: any gap makes the whole call a miss. Entries that
/// end before the current position are skipped, so overlapping input is fine.
pub fn coalesce(entries: &[CacheEntry], start: u64, end: u64) -> Option<Bytes> {
    if start > end {
        return None;
    }

    let mut sorted: Vec<&CacheEntry> = entries.iter().collect();
    sorted.sort_by_key(|entry| entry.range_start);

    let mut parts: Vec<Bytes> = Vec::new();
    let mut current = start;

    for entry in sorted {
        if current > end {
            break;
        }
        if entry.range_start > current {
            return None;
        }
        if entry.range_end < current {
            continue;
        }

        let from = usize::try_from(current - entry.range_start).ok()?;
        let wanted = usize::try_from(end - entry.range_start)
            .unwrap_or(usize::MAX)
            .saturating_add(1);
        let to = wanted.min(entry.len());
        if from >= to {
            continue;
        }

        parts.push(entry.data.slice(from..to));
        current = entry.range_start + to as u64;
    }

    if current <= end {
        return None;
    }

    // One contributing entry needs no copy.
    if parts.len() == 1 {
        return parts.pop();
    }

    let total = parts.iter().map(Bytes::len).sum();
    let mut out = BytesMut::with_capacity(total);
    for part in &parts {
        out.extend_from_slice(part);
    }
    Some(out.freeze())
}
