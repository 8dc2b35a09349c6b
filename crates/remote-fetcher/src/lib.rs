//! Remote resource fetcher
//!
//! Retrieves binary resources over HTTP(S) and normalizes them into a
//! content type plus body bytes. Performs no caching of its own; callers
//! that want reuse wrap a [`Fetcher`] in a cache.

pub mod error;
pub mod fetcher;
pub mod types;

pub use error::{FetchError, Result};
pub use fetcher::{parse_locator, Fetcher, HttpFetcher};
pub use types::{FetchedResource, FetcherConfig, DEFAULT_CONTENT_TYPE};
pub use url::Url;
