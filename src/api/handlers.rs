//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint. `GET /media` hosts the
//! request and response filters around a real upstream fetch.

use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Query, State},
    http::{
        header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, RANGE},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{RangeCache, RangeHit};
use crate::config::Config;
use crate::error::{RangeCacheError, Result};
use crate::fetch::{FetchedResponse, RangeFetcher, UpstreamResponse};
use crate::intercept::{
    filter_request, filter_response, is_media_resource, FilterOutcome, MediaRequest, MediaResponse,
};
use crate::models::{
    ClearResponse, HealthResponse, MediaQuery, PreloadRequest, PreloadResponse, StatsResponse,
};
use crate::preload::Preloader;
use crate::range::ContentRange;

/// Application state shared across all handlers.
///
/// The cache sits behind one `RwLock`; handlers never hold it across an
/// upstream request.
#[derive(Clone)]
pub struct AppState {
    /// Shared range cache
    pub cache: Arc<RwLock<RangeCache>>,
    /// Upstream client
    pub fetcher: RangeFetcher,
    pub preloader: Preloader,
}

impl AppState {
    /// Creates a new AppState around the given cache and fetcher.
    pub fn new(cache: RangeCache, fetcher: RangeFetcher) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            preloader: Preloader::new(fetcher.clone()),
            fetcher,
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = RangeCache::new(config.cache_config());
        let fetcher = RangeFetcher::new(std::time::Duration::from_secs(config.request_timeout))?;
        Ok(Self::new(cache, fetcher))
    }
}

fn x_cache() -> HeaderName {
    HeaderName::from_static("x-cache")
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|err| RangeCacheError::Internal(err.to_string()))
}

/// Handler for GET /media?url=...
///
/// Serves the requested range from cache when possible. Otherwise forwards
/// the request upstream with its `Range` header untouched. Cacheable answers
/// that fit the cache are buffered and stored; everything else is streamed
/// straight through.
pub async fn media_handler(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    if let Some(error_msg) = query.validate() {
        return Err(RangeCacheError::InvalidRequest(error_msg));
    }

    let range_header = headers.get(RANGE).and_then(|value| value.to_str().ok());
    let request = MediaRequest::new(&query.url, range_header);

    let outcome = {
        let mut cache = state.cache.write().await;
        filter_request(&mut cache, &request)
    };
    if let FilterOutcome::FromCache(hit) = outcome {
        return cached_response(hit);
    }

    let upstream = state.fetcher.send(&query.url, range_header).await?;
    let max_bytes = state.cache.read().await.config().max_bytes;
    if !fits_in_cache(
        &query.url,
        upstream.status,
        upstream.content_range.as_deref(),
        upstream.content_length,
        max_bytes,
    ) {
        return streamed_response(upstream);
    }

    let fetched = upstream.buffer().await?;
    {
        let response = MediaResponse {
            url: &query.url,
            status: fetched.status,
            content_range: fetched.content_range.as_deref(),
            etag: fetched.etag.as_deref(),
            body: fetched.body.clone(),
        };
        let mut cache = state.cache.write().await;
        filter_response(&mut cache, &response, false);
    }

    relay_response(fetched)
}

/// Whether an upstream answer is worth buffering for the cache.
///
/// Only successful media responses with a complete `Content-Range` no larger
/// than the cache itself qualify.
fn fits_in_cache(
    url: &str,
    status: u16,
    content_range: Option<&str>,
    content_length: Option<u64>,
    max_bytes: usize,
) -> bool {
    if !is_media_resource(url) || !(200..300).contains(&status) {
        return false;
    }
    let Some(range) = content_range.and_then(|value| ContentRange::parse(value).ok()) else {
        return false;
    };

    let limit = max_bytes as u64;
    let announced_too_long = matches!(content_length, Some(len) if len > limit);
    range.total.is_some() && range.byte_len() <= limit && !announced_too_long
}

fn cached_response(hit: RangeHit) -> Result<Response> {
    let content_range = ContentRange::new(hit.start, hit.end, Some(hit.content_length));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_RANGE, header_value(&content_range.to_header_value())?);
    if let Some(etag) = hit.etag.as_deref() {
        headers.insert(ETAG, header_value(etag)?);
    }
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(x_cache(), HeaderValue::from_static("HIT"));

    Ok((StatusCode::PARTIAL_CONTENT, headers, hit.data).into_response())
}

fn upstream_status(status: u16) -> Result<StatusCode> {
    StatusCode::from_u16(status)
        .map_err(|_| RangeCacheError::Upstream(format!("invalid status {status}")))
}

/// Headers relayed from the origin on a miss.
fn miss_headers(
    content_range: Option<&str>,
    content_type: Option<&str>,
    etag: Option<&str>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(content_range) = content_range {
        headers.insert(CONTENT_RANGE, header_value(content_range)?);
    }
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
    }
    if let Some(etag) = etag {
        headers.insert(ETAG, header_value(etag)?);
    }
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(x_cache(), HeaderValue::from_static("MISS"));
    Ok(headers)
}

fn relay_response(fetched: FetchedResponse) -> Result<Response> {
    let status = upstream_status(fetched.status)?;
    let headers = miss_headers(
        fetched.content_range.as_deref(),
        fetched.content_type.as_deref(),
        fetched.etag.as_deref(),
    )?;

    Ok((status, headers, fetched.body).into_response())
}

fn streamed_response(upstream: UpstreamResponse) -> Result<Response> {
    let status = upstream_status(upstream.status)?;
    let mut headers = miss_headers(
        upstream.content_range.as_deref(),
        upstream.content_type.as_deref(),
        upstream.etag.as_deref(),
    )?;
    if let Some(len) = upstream.content_length {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }

    Ok((status, headers, upstream.into_body()).into_response())
}

/// Handler for POST /preload
///
/// Runs the preload to completion. Upstream failures are not reported as
/// errors; the returned ranges show what ended up cached.
pub async fn preload_handler(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<(StatusCode, Json<PreloadResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(RangeCacheError::InvalidRequest(error_msg));
    }

    state.preloader.preload(&state.cache, &req.url, req.bytes).await;
    let cached_ranges = state.cache.read().await.ranges(&req.url);

    Ok((
        StatusCode::ACCEPTED,
        Json(PreloadResponse {
            url: req.url,
            requested_bytes: req.bytes,
            cached_ranges,
        }),
    ))
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;
    Json(StatsResponse::new(&cache.stats(), cache.config().max_bytes))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.write().await.clear();
    Json(ClearResponse::new(removed))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
