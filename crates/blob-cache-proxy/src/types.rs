//! Configuration and response types for the blob cache proxy

use remote_fetcher::FetcherConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ttl_blob_cache::{CacheConfig, CacheStats};

/// Configuration for the proxy, read once from the environment at startup
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    pub cache_ttl_secs: u64,
    pub check_period_secs: u64,
    pub single_flight: bool,
    pub strict_ttl: bool,
    pub fetch_timeout_secs: u64,
    pub expected_content_type: Option<String>,
}

impl ProxyConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |name: &str, default: u64| {
            lookup(name)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        let flag = |name: &str| lookup(name).map(|v| is_true(&v)).unwrap_or(false);

        let port = lookup("PORT")
            .and_then(|s| s.trim().parse::<u16>().ok())
            .unwrap_or(defaults.port);

        Self {
            port,
            cache_ttl_secs: number("CACHE_TTL_SECS", defaults.cache_ttl_secs),
            check_period_secs: number("CACHE_CHECK_PERIOD_SECS", defaults.check_period_secs),
            single_flight: flag("CACHE_SINGLE_FLIGHT"),
            strict_ttl: flag("CACHE_STRICT_TTL"),
            fetch_timeout_secs: number("FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
            expected_content_type: lookup("FETCH_CONTENT_TYPE").filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            check_period: Duration::from_secs(self.check_period_secs),
            single_flight: self.single_flight,
            strict_ttl: self.strict_ttl,
            ..CacheConfig::default()
        }
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: Duration::from_secs(self.fetch_timeout_secs),
            expected_content_type: self.expected_content_type.clone(),
            ..FetcherConfig::default()
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cache_ttl_secs: 24 * 60 * 60, // 24 hours
            check_period_secs: 60 * 60,   // 1 hour
            single_flight: false,
            strict_ttl: false,
            fetch_timeout_secs: 30,
            expected_content_type: None,
        }
    }
}

fn is_true(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}

/// Query string for `/fetch`
#[derive(Debug, Deserialize)]
pub struct FetchQuery {
    pub url: String,
    #[serde(default = "default_as_bytes")]
    pub as_bytes: bool,
}

fn default_as_bytes() -> bool {
    true
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cache: CacheStats,
}
