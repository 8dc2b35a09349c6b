//! Error types for the blob cache proxy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;
use ttl_blob_cache::CacheError;

#[derive(Debug)]
pub enum ProxyError {
    Cache(CacheError),
    NotCached,
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Cache(err) => write!(f, "Cache error: {}", err),
            ProxyError::NotCached => write!(f, "Resource not cached"),
            ProxyError::Io(err) => write!(f, "IO error: {}", err),
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProxyError::Cache(err) => Some(err),
            ProxyError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::Cache(CacheError::InvalidLocator { .. }) => StatusCode::BAD_REQUEST,
            ProxyError::Cache(CacheError::Network { .. }) => StatusCode::BAD_GATEWAY,
            ProxyError::Cache(CacheError::Decode { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::Cache(CacheError::Cancelled(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::NotCached => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!(error = %self, "Internal server error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<CacheError> for ProxyError {
    fn from(err: CacheError) -> Self {
        ProxyError::Cache(err)
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ProxyError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ProxyError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ProxyError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_config_error_display() {
        let err = ProxyError::Config("invalid PORT".to_string());
        assert_eq!(format!("{}", err), "Configuration error: invalid PORT");
    }

    #[test]
    fn test_cache_error_status_mapping() {
        assert_eq!(
            status_of(ProxyError::Cache(CacheError::InvalidLocator {
                locator: "".to_string(),
                reason: "locator is empty".to_string(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ProxyError::Cache(CacheError::Network {
                url: "https://example.com".to_string(),
                status: Some(500),
                reason: "upstream returned status 500".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ProxyError::Cache(CacheError::Decode {
                url: "https://example.com".to_string(),
                reason: "bad header".to_string(),
            })),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ProxyError::Cache(CacheError::StoreCorruption(
                "task died".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ProxyError::Cache(CacheError::Cancelled(
                "runtime shutting down".to_string()
            ))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(ProxyError::Cache(CacheError::Io("disk full".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(ProxyError::NotCached), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_is_debug() {
        let err = ProxyError::Config("test".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Config"));
    }
}
