//! Range Cache - caching proxy for progressive MP4 playback
//!
//! Point a player at `GET /media?url=<upstream>` and its range requests are
//! answered from memory whenever the bytes are already cached.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use range_cache::api::create_router;
use range_cache::{spawn_purge_task, AppState, Config};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and upstream client
/// 4. Start background expiry purge task
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "range_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Range Cache proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_cache_bytes={}, max_entries={}, expiry={}s, coalescing={}, port={}",
        config.max_cache_bytes,
        config.max_entries,
        config.expiry_secs,
        config.coalescing_enabled,
        config.server_port
    );

    let state = AppState::from_config(&config).context("failed to build upstream client")?;
    info!("Range cache initialized");

    let purge_handle = spawn_purge_task(state.cache.clone(), config.cleanup_interval);
    info!("Background purge task started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(purge_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the purge task and allows graceful shutdown.
async fn shutdown_signal(purge_handle: tokio::task::JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    purge_handle.abort();
    warn!("Purge task aborted");
}
