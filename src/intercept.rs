//! Request/Response Interception
//!
//! Adapters that plug a [`RangeCache`] into any network pipeline. The request
//! filter answers from cache when it can; the response filter stores what the
//! network returned. Both ignore traffic that is not a media file.

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::cache::{RangeCache, RangeHit};
use crate::range::{ContentRange, RangeRequest};

/// Path extensions treated as cacheable media.
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "m4s", "m4v", "m4a"];

// == Media Request ==
/// The parts of an outgoing request the request filter looks at.
#[derive(Debug, Clone, Copy)]
pub struct MediaRequest<'a> {
    pub url: &'a str,
    /// Raw `Range` header value, if any
    pub range: Option<&'a str>,
}

impl<'a> MediaRequest<'a> {
    pub fn new(url: &'a str, range: Option<&'a str>) -> Self {
        Self { url, range }
    }
}

// == Media Response ==
/// The parts of a completed response the response filter looks at.
#[derive(Debug, Clone)]
pub struct MediaResponse<'a> {
    pub url: &'a str,
    pub status: u16,
    /// Raw `Content-Range` header value, if any
    pub content_range: Option<&'a str>,
    pub etag: Option<&'a str>,
    pub body: Bytes,
}

// == Filter Outcome ==
/// Result of the request filter, threaded through the pipeline explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// The cache holds the requested bytes; skip the network.
    FromCache(RangeHit),
    /// Go to the network.
    Network,
}

impl FilterOutcome {
    pub fn satisfied_from_cache(&self) -> bool {
        matches!(self, FilterOutcome::FromCache(_))
    }

    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            FilterOutcome::FromCache(hit) => Some(&hit.data),
            FilterOutcome::Network => None,
        }
    }
}

// == Is Media Resource ==
/// Returns true if the URL path ends in one of [`MEDIA_EXTENSIONS`].
pub fn is_media_resource(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    path.rsplit_once('.')
        .map(|(_, ext)| {
            MEDIA_EXTENSIONS
                .iter()
                .any(|media| ext.eq_ignore_ascii_case(media))
        })
        .unwrap_or(false)
}

// == Filter Request ==
/// Consults the cache for a ranged media request.
pub fn filter_request(cache: &mut RangeCache, request: &MediaRequest<'_>) -> FilterOutcome {
    if !is_media_resource(request.url) {
        return FilterOutcome::Network;
    }
    let Some(header) = request.range else {
        return FilterOutcome::Network;
    };

    let range = match RangeRequest::parse(header) {
        Ok(range) => range,
        Err(err) => {
            debug!(url = request.url, %err, "unusable range header, bypassing cache");
            return FilterOutcome::Network;
        }
    };

    match cache.lookup(request.url, range.start, range.end) {
        Some(hit) => FilterOutcome::FromCache(hit),
        None => FilterOutcome::Network,
    }
}

// == Filter Response ==
/// Stores a network response for a media request.
///
/// Returns true if the body was handed to the cache.
pub fn filter_response(
    cache: &mut RangeCache,
    response: &MediaResponse<'_>,
    satisfied_from_cache: bool,
) -> bool {
    if satisfied_from_cache || !is_media_resource(response.url) {
        return false;
    }
    if !(200..300).contains(&response.status) {
        return false;
    }
    let Some(header) = response.content_range else {
        return false;
    };

    let range = match ContentRange::parse(header) {
        Ok(range) => range,
        Err(err) => {
            debug!(url = response.url, %err, "unusable content range, not caching");
            return false;
        }
    };
    let Some(total) = range.total else {
        debug!(url = response.url, "content range without total, not caching");
        return false;
    };
    if range.byte_len() != response.body.len() as u64 {
        debug!(
            url = response.url,
            expected = range.byte_len(),
            actual = response.body.len(),
            "body length disagrees with content range, not caching"
        );
        return false;
    }

    cache.store_range(
        response.url,
        response.body.clone(),
        range.start,
        range.end,
        total,
        response.etag.map(str::to_string),
    );
    true
}
