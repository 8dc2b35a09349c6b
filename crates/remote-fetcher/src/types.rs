//! Fetcher types

use serde::Serialize;
use std::time::Duration;

/// Content type reported when the upstream omits the header
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const DEFAULT_USER_AGENT: &str = concat!("remote-fetcher/", env!("CARGO_PKG_VERSION"));

/// A retrieved resource, normalized to its content type and raw body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedResource {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Settings for [`crate::HttpFetcher`]
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Overall request timeout
    pub timeout: Duration,
    pub user_agent: String,
    /// When set, responses whose content type does not start with this
    /// prefix are rejected as undecodable (e.g. `"image/"`).
    pub expected_content_type: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            expected_content_type: None,
        }
    }
}
