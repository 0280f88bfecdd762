//! Byte Range Headers
//!
//! Parsing and formatting for `Range: bytes=<start>-[<end>]` and
//! `Content-Range: bytes <start>-<end>/<total>`.

use std::fmt;
use std::str::FromStr;

use crate::error::{RangeCacheError, Result};

// == Range Request ==
/// A single `Range` request. `end == None` means "to the end of the resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub start: u64,
    pub end: Option<u64>,
}

impl RangeRequest {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    /// Parses a `Range` header value.
    ///
    /// Only the single-range `bytes` form with an explicit start is accepted;
    /// suffix ranges (`bytes=-500`) and multi-range requests are rejected.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || RangeCacheError::InvalidRange(value.to_string());

        let raw = value.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
        if raw.contains(',') {
            return Err(invalid());
        }
        let (start, end) = raw.split_once('-').ok_or_else(invalid)?;

        let start: u64 = start.trim().parse().map_err(|_| invalid())?;
        let end = match end.trim() {
            "" => None,
            end => Some(end.parse::<u64>().map_err(|_| invalid())?),
        };
        if end.is_some_and(|end| end < start) {
            return Err(invalid());
        }

        Ok(Self { start, end })
    }

    /// Formats the request as a `Range` header value.
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RangeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "bytes={}-{}", self.start, end),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

impl FromStr for RangeRequest {
    type Err = RangeCacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// == Content Range ==
/// A `Content-Range` response header. `total == None` stands for `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn new(start: u64, end: u64, total: Option<u64>) -> Self {
        Self { start, end, total }
    }

    /// Parses a `Content-Range` header value.
    ///
    /// The unsatisfied form (`bytes */1000`) is rejected since it carries no
    /// bytes to cache.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || RangeCacheError::InvalidContentRange(value.to_string());

        let raw = value.trim().strip_prefix("bytes ").ok_or_else(invalid)?;
        let (range, total) = raw.split_once('/').ok_or_else(invalid)?;
        let (start, end) = range.split_once('-').ok_or_else(invalid)?;

        let start: u64 = start.trim().parse().map_err(|_| invalid())?;
        let end: u64 = end.trim().parse().map_err(|_| invalid())?;
        let total = match total.trim() {
            "*" => None,
            total => Some(total.parse::<u64>().map_err(|_| invalid())?),
        };

        if end < start || total.is_some_and(|total| end >= total) {
            return Err(invalid());
        }

        Ok(Self { start, end, total })
    }

    /// Number of bytes the range covers.
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Formats the range as a `Content-Range` header value.
    pub fn to_header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "bytes {}-{}/{}", self.start, self.end, total),
            None => write!(f, "bytes {}-{}/*", self.start, self.end),
        }
    }
}

impl FromStr for ContentRange {
    type Err = RangeCacheError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
