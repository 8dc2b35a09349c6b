//! Error types for the TTL blob cache

use remote_fetcher::FetchError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The locator was empty or not an absolute HTTP(S) URL
    InvalidLocator { locator: String, reason: String },
    /// Transport failure or non-success status from the upstream
    Network {
        url: String,
        status: Option<u16>,
        reason: String,
    },
    /// The upstream body could not be interpreted as the expected content
    Decode { url: String, reason: String },
    /// Local I/O failure while fetching
    Io(String),
    /// Rejected cache settings
    InvalidConfig(String),
    /// The fetch task was cancelled, normally because the runtime is
    /// shutting down. Nothing was stored.
    Cancelled(String),
    /// A fetch task panicked without producing a result
    StoreCorruption(String),
}

impl CacheError {
    /// Whether the caller may reasonably retry the same request later
    pub fn is_transient(&self) -> bool {
        matches!(self, CacheError::Network { .. })
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidLocator { locator, reason } => {
                write!(f, "Invalid locator {:?}: {}", locator, reason)
            }
            CacheError::Network {
                url,
                status: Some(status),
                reason,
            } => write!(f, "Network error for {} (status {}): {}", url, status, reason),
            CacheError::Network {
                url,
                status: None,
                reason,
            } => write!(f, "Network error for {}: {}", url, reason),
            CacheError::Decode { url, reason } => write!(f, "Decode error for {}: {}", url, reason),
            CacheError::Io(msg) => write!(f, "IO error: {}", msg),
            CacheError::InvalidConfig(msg) => write!(f, "Invalid cache configuration: {}", msg),
            CacheError::Cancelled(msg) => write!(f, "Fetch cancelled: {}", msg),
            CacheError::StoreCorruption(msg) => write!(f, "Cache store corruption: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<FetchError> for CacheError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl { url, reason } => CacheError::InvalidLocator {
                locator: url,
                reason,
            },
            FetchError::Network {
                url,
                status,
                reason,
            } => CacheError::Network {
                url,
                status,
                reason,
            },
            FetchError::Decode { url, reason } => CacheError::Decode { url, reason },
            FetchError::Io(reason) => CacheError::Io(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
