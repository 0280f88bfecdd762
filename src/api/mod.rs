//! API Module
//!
//! HTTP handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /media?url=...` - Fetch a (ranged) media file through the cache
//! - `POST /preload` - Warm the cache with the head of a file
//! - `GET /stats` - Get cache statistics
//! - `DELETE /cache` - Drop every cached range
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
