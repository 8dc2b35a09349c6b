//! Blob cache proxy - serves remote resources through an in-memory TTL cache
//!
//! Fetches each resource once, serves repeats from memory until the TTL
//! elapses, and drains the cache on graceful shutdown so every remaining
//! entry is logged before the process exits.

mod error;
mod server;
mod types;

use crate::error::{ProxyError, Result};
use crate::server::{start_server, ServerState, SharedState};
use crate::types::ProxyConfig;
use remote_fetcher::HttpFetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use ttl_blob_cache::{Eviction, ResourceCache};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter =
        EnvFilter::from_default_env().add_directive("blob_cache_proxy=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    info!("Starting blob cache proxy...");

    let config = ProxyConfig::from_env();
    info!("Port: {}", config.port);
    info!("Cache TTL: {} seconds", config.cache_ttl_secs);
    info!("Check period: {} seconds", config.check_period_secs);

    let fetcher = HttpFetcher::with_config(config.fetcher_config())
        .map_err(|e| ProxyError::Config(format!("HTTP client: {}", e)))?;
    let cache = ResourceCache::new(config.cache_config(), fetcher)?;
    let eviction_logger = spawn_eviction_logger(cache.subscribe());

    let state: SharedState = Arc::new(ServerState::new(cache));

    // Blocks until a shutdown signal arrives and open requests finish
    start_server(state.clone(), config.port, shutdown_signal()).await?;

    let drained = state.cache.shutdown(true).await;
    info!(drained, "Cache closed before exiting");

    // Dropping the last handle closes the notification channel, letting the
    // logger flush what is buffered and exit
    drop(state);
    if tokio::time::timeout(Duration::from_secs(5), eviction_logger)
        .await
        .is_err()
    {
        warn!("Timed out flushing eviction notifications");
    }

    Ok(())
}

/// Log every eviction until the cache is dropped
fn spawn_eviction_logger(mut evictions: mpsc::UnboundedReceiver<Eviction>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(eviction) = evictions.recv().await {
            info!(
                key = %eviction.key,
                reason = %eviction.reason,
                "Removing cached resource"
            );
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
