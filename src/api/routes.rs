//! API Routes
//!
//! Configures the Axum router with all proxy endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, health_handler, media_handler, preload_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin, so browser players can use the proxy directly
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/media", get(media_handler))
        .route("/preload", post(preload_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
