//! Integration Tests for the caching proxy
//!
//! Runs a local upstream that serves byte ranges and drives the proxy router
//! through full request/response cycles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use range_cache::{
    api::create_router, fetch::RangeFetcher, range::RangeRequest, AppState, CacheConfig,
    RangeCache,
};
use serde_json::Value;
use tower::ServiceExt;

const RESOURCE_LEN: usize = 10_000;

// == Upstream Fixture ==

#[derive(Clone)]
struct Upstream {
    data: Arc<Vec<u8>>,
    requests: Arc<AtomicUsize>,
}

async fn range_endpoint(State(upstream): State<Upstream>, headers: HeaderMap) -> Response {
    upstream.requests.fetch_add(1, Ordering::SeqCst);
    let data = &upstream.data;
    let len = data.len() as u64;

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| RangeRequest::parse(value).ok());

    match range {
        Some(range) if range.start < len => {
            let end = range.end.unwrap_or(len - 1).min(len - 1);
            let body = data[range.start as usize..=end as usize].to_vec();
            (
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_RANGE, format!("bytes {}-{}/{}", range.start, end, len)),
                    (header::CONTENT_TYPE, "video/mp4".to_string()),
                    (header::ETAG, "\"v1\"".to_string()),
                ],
                body,
            )
                .into_response()
        }
        _ => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "video/mp4".to_string())],
            data.to_vec(),
        )
            .into_response(),
    }
}

struct Fixture {
    base: String,
    data: Arc<Vec<u8>>,
    requests: Arc<AtomicUsize>,
}

impl Fixture {
    fn upstream_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn media_uri(&self, path: &str) -> String {
        let upstream = format!("{}{}", self.base, path);
        let encoded: String = url::form_urlencoded::byte_serialize(upstream.as_bytes()).collect();
        format!("/media?url={encoded}")
    }
}

async fn spawn_upstream() -> Fixture {
    let data: Arc<Vec<u8>> = Arc::new((0..RESOURCE_LEN).map(|i| (i % 251) as u8).collect());
    let requests = Arc::new(AtomicUsize::new(0));
    let upstream = Upstream {
        data: data.clone(),
        requests: requests.clone(),
    };

    let router = Router::new()
        .route("/video.mp4", get(range_endpoint))
        .route("/catalog.json", get(range_endpoint))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    Fixture {
        base: format!("http://{addr}"),
        data,
        requests,
    }
}

// == Helper Functions ==

fn create_test_app(config: CacheConfig) -> Router {
    // Loopback upstream; bypass any proxy configured in the environment.
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let fetcher = RangeFetcher::with_client(client);
    let state = AppState::new(RangeCache::new(config), fetcher);
    create_router(state)
}

async fn get_range(app: &Router, uri: &str, range: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::RANGE, range)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_to_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn x_cache(response: &Response) -> &str {
    response.headers()["x-cache"].to_str().unwrap()
}

// == Media Endpoint Tests ==

#[tokio::test]
async fn test_miss_then_hit() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());

    let first = get_range(&app, &upstream.media_uri("/video.mp4?t=1"), "bytes=0-999").await;
    assert_eq!(first.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(x_cache(&first), "MISS");
    assert_eq!(first.headers()[header::CONTENT_RANGE], "bytes 0-999/10000");
    assert_eq!(body_bytes(first).await, upstream.data[..1000].to_vec());

    let second = get_range(&app, &upstream.media_uri("/video.mp4?t=2"), "bytes=100-199").await;
    assert_eq!(second.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(x_cache(&second), "HIT");
    assert_eq!(second.headers()[header::CONTENT_RANGE], "bytes 100-199/10000");
    assert_eq!(body_bytes(second).await, upstream.data[100..200].to_vec());

    assert_eq!(upstream.upstream_requests(), 1);
}

#[tokio::test]
async fn test_coalesced_hit_through_proxy() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/video.mp4");

    get_range(&app, &uri, "bytes=0-4999").await;
    get_range(&app, &uri, "bytes=5000-9999").await;

    let response = get_range(&app, &uri, "bytes=2000-7999").await;
    assert_eq!(x_cache(&response), "HIT");
    assert_eq!(body_bytes(response).await, upstream.data[2000..8000].to_vec());
    assert_eq!(upstream.upstream_requests(), 2);
}

#[tokio::test]
async fn test_gap_goes_upstream() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/video.mp4");

    get_range(&app, &uri, "bytes=0-3999").await;
    get_range(&app, &uri, "bytes=6000-9999").await;

    let response = get_range(&app, &uri, "bytes=1000-8999").await;
    assert_eq!(x_cache(&response), "MISS");
    assert_eq!(body_bytes(response).await, upstream.data[1000..9000].to_vec());
    assert_eq!(upstream.upstream_requests(), 3);
}

#[tokio::test]
async fn test_open_ended_range() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/video.mp4");

    let first = get_range(&app, &uri, "bytes=5000-").await;
    assert_eq!(x_cache(&first), "MISS");

    let second = get_range(&app, &uri, "bytes=9000-").await;
    assert_eq!(x_cache(&second), "HIT");
    assert_eq!(second.headers()[header::CONTENT_RANGE], "bytes 9000-9999/10000");
    assert_eq!(body_bytes(second).await, upstream.data[9000..].to_vec());
}

#[tokio::test]
async fn test_non_media_is_never_cached() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/catalog.json");

    let first = get_range(&app, &uri, "bytes=0-99").await;
    let second = get_range(&app, &uri, "bytes=0-99").await;

    assert_eq!(x_cache(&first), "MISS");
    assert_eq!(x_cache(&second), "MISS");
    assert_eq!(upstream.upstream_requests(), 2);
}

#[tokio::test]
async fn test_upstream_status_is_relayed() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/missing.mp4");

    let response = get_range(&app, &uri, "bytes=0-99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_range(&app, &uri, "bytes=0-99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(x_cache(&response), "MISS");
}

#[tokio::test]
async fn test_uncacheable_ranges_are_relayed_upstream() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());

    let suffix = get_range(&app, &upstream.media_uri("/catalog.json"), "bytes=-500").await;
    assert_eq!(suffix.status(), StatusCode::OK);
    assert_eq!(x_cache(&suffix), "MISS");
    assert_eq!(body_bytes(suffix).await, upstream.data.to_vec());
    assert_eq!(upstream.upstream_requests(), 1);

    let uri = upstream.media_uri("/video.mp4");
    for expected_requests in [2, 3] {
        let multi = get_range(&app, &uri, "bytes=0-10,20-30").await;
        assert_eq!(multi.status(), StatusCode::OK);
        assert_eq!(x_cache(&multi), "MISS");
        assert_eq!(upstream.upstream_requests(), expected_requests);
    }
}

#[tokio::test]
async fn test_range_larger_than_cache_is_streamed_not_stored() {
    let upstream = spawn_upstream().await;
    let config = CacheConfig {
        max_bytes: 2_000,
        ..CacheConfig::default()
    };
    let app = create_test_app(config);
    let uri = upstream.media_uri("/video.mp4");

    get_range(&app, &uri, "bytes=0-999").await;
    get_range(&app, &uri, "bytes=1000-1999").await;

    let whole = get_range(&app, &uri, "bytes=0-").await;
    assert_eq!(whole.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(x_cache(&whole), "MISS");
    assert_eq!(whole.headers()[header::CONTENT_RANGE], "bytes 0-9999/10000");
    assert_eq!(body_bytes(whole).await, upstream.data.to_vec());

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response).await;
    assert_eq!(json["total_bytes"], 2000);
    assert_eq!(json["total_entries"], 2);
    assert_eq!(json["evictions"], 0);

    let kept = get_range(&app, &uri, "bytes=500-1499").await;
    assert_eq!(x_cache(&kept), "HIT");
    assert_eq!(upstream.upstream_requests(), 3);
}

#[tokio::test]
async fn test_eviction_through_proxy() {
    let upstream = spawn_upstream().await;
    let config = CacheConfig {
        max_bytes: 2_000,
        ..CacheConfig::default()
    };
    let app = create_test_app(config);
    let uri = upstream.media_uri("/video.mp4");

    get_range(&app, &uri, "bytes=0-999").await;
    get_range(&app, &uri, "bytes=1000-1999").await;
    get_range(&app, &uri, "bytes=2000-2999").await;

    let evicted = get_range(&app, &uri, "bytes=0-99").await;
    assert_eq!(x_cache(&evicted), "MISS");

    let kept = get_range(&app, &uri, "bytes=2000-2099").await;
    assert_eq!(x_cache(&kept), "HIT");
}

// == Preload Endpoint Tests ==

#[tokio::test]
async fn test_preload_then_hit() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let target = format!("{}/video.mp4", upstream.base);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/preload")
                .header("content-type", "application/json")
                .body(Body::from(format!(r#"{{"url":"{target}","bytes":4096}}"#)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_to_json(response).await;
    assert_eq!(json["cached_ranges"], serde_json::json!([[0, 4095]]));

    let hit = get_range(&app, &upstream.media_uri("/video.mp4"), "bytes=1024-2047").await;
    assert_eq!(x_cache(&hit), "HIT");
    assert_eq!(body_bytes(hit).await, upstream.data[1024..2048].to_vec());
    assert_eq!(upstream.upstream_requests(), 1);
}

// == Stats / Clear Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/video.mp4");

    get_range(&app, &uri, "bytes=0-499").await;
    get_range(&app, &uri, "bytes=500-999").await;
    get_range(&app, &uri, "bytes=0-999").await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["coalesced_hits"], 1);
    assert_eq!(json["misses"], 2);
    assert_eq!(json["total_entries"], 2);
    assert_eq!(json["total_bytes"], 1000);
}

#[tokio::test]
async fn test_clear_endpoint() {
    let upstream = spawn_upstream().await;
    let app = create_test_app(CacheConfig::default());
    let uri = upstream.media_uri("/video.mp4");

    get_range(&app, &uri, "bytes=0-999").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["removed"], 1);

    let again = get_range(&app, &uri, "bytes=0-99").await;
    assert_eq!(x_cache(&again), "MISS");
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(CacheConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response).await["status"], "healthy");
}
