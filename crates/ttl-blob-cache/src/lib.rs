//! In-memory TTL cache for remote resources
//!
//! Fetches a resource once, serves identical requests from memory until its
//! time-to-live elapses, and reclaims expired entries on a periodic sweep.
//! Every removal is published as an [`Eviction`] notification.
//!
//! ```no_run
//! use remote_fetcher::HttpFetcher;
//! use ttl_blob_cache::{CacheConfig, FetchOptions, ResourceCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = ResourceCache::new(CacheConfig::default(), HttpFetcher::new()?)?;
//!
//! let image = cache
//!     .get("https://example.com/logo.png", FetchOptions::bytes())
//!     .await?;
//! println!("{} ({} bytes)", image.content_type, image.content.len());
//!
//! cache.shutdown(true).await;
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod key;
mod store;
mod sweeper;
mod types;

pub use cache::{CacheStatus, ResourceCache};
pub use error::{CacheError, Result};
pub use key::{CacheKey, FetchOptions};
pub use store::EntryStore;
pub use sweeper::Sweeper;
pub use types::{
    CacheConfig, CacheEntry, CacheStats, Content, Eviction, EvictionReason, Resource,
};
