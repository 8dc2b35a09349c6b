//! HTTP server for cached resource endpoints
//!
//! Provides /health and /fetch (GET to serve, DELETE to evict).

use crate::error::{ProxyError, Result};
use crate::types::{FetchQuery, HealthResponse};
use axum::{
    extract::{Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use remote_fetcher::HttpFetcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use ttl_blob_cache::{Content, FetchOptions, ResourceCache};

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Shared state for the HTTP server
pub struct ServerState {
    pub cache: ResourceCache<HttpFetcher>,
    pub started_at: DateTime<Utc>,
}

impl ServerState {
    pub fn new(cache: ResourceCache<HttpFetcher>) -> Self {
        Self {
            cache,
            started_at: Utc::now(),
        }
    }
}

/// Downstream caches may keep a response only as long as our entry lives
fn cache_control(expires_in: Duration) -> String {
    format!("public, max-age={}", expires_in.as_secs())
}

pub type SharedState = Arc<ServerState>;

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fetch", get(get_resource).delete(evict_resource))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves, then finish in-flight requests
pub async fn start_server(
    state: SharedState,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        cache: state.cache.stats(),
    })
}

/// Serve a resource through the cache
///
/// Raw bytes go out as the body with the upstream content type; base64
/// content is wrapped as `{"type", "content"}` JSON.
async fn get_resource(
    State(state): State<SharedState>,
    Query(query): Query<FetchQuery>,
) -> Result<Response> {
    let options = FetchOptions {
        as_bytes: query.as_bytes,
    };

    let (resource, status) = state
        .cache
        .get_with_status(&query.url, options)
        .await
        .map_err(|e| {
            warn!(url = %query.url, error = %e, "Failed to serve resource");
            ProxyError::from(e)
        })?;

    // An entry evicted since the get is not cacheable downstream at all
    let control = cache_control(
        state
            .cache
            .time_to_live(&query.url, options)?
            .unwrap_or(Duration::ZERO),
    );

    let response = match &resource.content {
        Content::Bytes(bytes) => (
            [
                (header::CONTENT_TYPE, resource.content_type.clone()),
                (header::CACHE_CONTROL, control),
                (X_CACHE, status.as_str().to_string()),
            ],
            bytes.clone(),
        )
            .into_response(),
        Content::Base64(_) => (
            [
                (header::CACHE_CONTROL, control),
                (X_CACHE, status.as_str().to_string()),
            ],
            Json(resource.as_ref()),
        )
            .into_response(),
    };

    Ok(response)
}

/// Explicitly evict a cached resource
async fn evict_resource(
    State(state): State<SharedState>,
    Query(query): Query<FetchQuery>,
) -> Result<StatusCode> {
    let options = FetchOptions {
        as_bytes: query.as_bytes,
    };

    if state.cache.invalidate(&query.url, options)? {
        info!(url = %query.url, as_bytes = query.as_bytes, "Evicted on request");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ProxyError::NotCached)
    }
}
