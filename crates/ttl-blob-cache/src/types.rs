//! Cache types

use crate::error::{CacheError, Result};
use crate::key::{CacheKey, FetchOptions};
use base64::Engine;
use remote_fetcher::FetchedResource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Body of a cached resource in the representation the caller asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Content {
    Bytes(Vec<u8>),
    Base64(String),
}

impl Content {
    pub fn len(&self) -> usize {
        match self {
            Content::Bytes(bytes) => bytes.len(),
            Content::Base64(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fetched resource as stored in and served from the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: Content,
}

impl Resource {
    /// Shape a fetched body according to the request options
    pub fn from_fetched(fetched: FetchedResource, options: FetchOptions) -> Self {
        let content = if options.as_bytes {
            Content::Bytes(fetched.bytes)
        } else {
            Content::Base64(base64::engine::general_purpose::STANDARD.encode(&fetched.bytes))
        };

        Self {
            content_type: fetched.content_type,
            content,
        }
    }
}

/// A stored resource plus its expiry metadata
///
/// Entries are never mutated once stored; lookups hand out clones that share
/// the underlying resource.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: Arc<Resource>,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) >= self.ttl
    }

    /// Time left before the entry expires; zero once it has
    pub fn expires_in(&self, now: Instant) -> Duration {
        self.ttl.saturating_sub(self.age(now))
    }
}

/// Why an entry left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionReason {
    Expired,
    Explicit,
    Shutdown,
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EvictionReason::Expired => "expired",
            EvictionReason::Explicit => "explicit",
            EvictionReason::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

/// Notification emitted for every removed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub key: CacheKey,
    pub reason: EvictionReason,
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_size: u64,
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    pub evictions: u64,
}

/// Configuration for a [`crate::ResourceCache`], read once at construction
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long an entry may be served
    pub ttl: Duration,
    /// Interval between sweeps of expired entries
    pub check_period: Duration,
    /// Coalesce concurrent misses for one key into a single fetch.
    ///
    /// Off by default: concurrent misses each fetch and the last insert wins.
    /// Turning it on trades a registry lookup per miss for fewer upstream
    /// requests under a stampede; every waiter then shares the one result,
    /// including its error.
    pub single_flight: bool,
    /// Re-check TTL on read instead of relying on the sweeper alone.
    ///
    /// Without it, an entry can be served for up to `check_period` past its
    /// TTL.
    pub strict_ttl: bool,
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(CacheError::InvalidConfig("ttl must be non-zero".to_string()));
        }
        if self.check_period.is_zero() {
            return Err(CacheError::InvalidConfig(
                "check_period must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),     // one day
            check_period: Duration::from_secs(60 * 60), // hourly
            single_flight: false,
            strict_ttl: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(bytes: &[u8]) -> FetchedResource {
        FetchedResource {
            content_type: "image/png".to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(86400));
        assert_eq!(config.check_period, Duration::from_secs(3600));
        assert!(!config.single_flight);
        assert!(!config.strict_ttl);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_rejects_zero_durations() {
        let config = CacheConfig {
            check_period: Duration::ZERO,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidConfig(_))
        ));

        let config = CacheConfig {
            ttl: Duration::ZERO,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resource_keeps_raw_bytes() {
        let resource = Resource::from_fetched(fetched(b"hello"), FetchOptions::bytes());
        assert_eq!(resource.content_type, "image/png");
        assert_eq!(resource.content, Content::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn test_resource_base64_encodes() {
        let resource = Resource::from_fetched(fetched(b"hello"), FetchOptions::base64());
        assert_eq!(resource.content, Content::Base64("aGVsbG8=".to_string()));
        assert_eq!(resource.content.len(), 8);
    }

    #[test]
    fn test_resource_serialization() {
        let resource = Resource::from_fetched(fetched(b"abc"), FetchOptions::base64());
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["content"], "YWJj");
    }

    #[test]
    fn test_entry_expiry_boundary() {
        let now = Instant::now();
        let entry = CacheEntry {
            key: CacheKey::build("https://example.com/a", FetchOptions::bytes()).unwrap(),
            value: Arc::new(Resource::from_fetched(fetched(b"a"), FetchOptions::bytes())),
            inserted_at: now,
            ttl: Duration::from_secs(2),
        };

        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + Duration::from_millis(1999)));
        assert!(entry.is_expired(now + Duration::from_secs(2)));

        assert_eq!(entry.expires_in(now), Duration::from_secs(2));
        assert_eq!(
            entry.expires_in(now + Duration::from_millis(1500)),
            Duration::from_millis(500)
        );
        assert_eq!(entry.expires_in(now + Duration::from_secs(7)), Duration::ZERO);
    }

    #[test]
    fn test_eviction_reason_display() {
        assert_eq!(EvictionReason::Expired.to_string(), "expired");
        assert_eq!(EvictionReason::Explicit.to_string(), "explicit");
        assert_eq!(EvictionReason::Shutdown.to_string(), "shutdown");
    }

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.total_size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }
}
