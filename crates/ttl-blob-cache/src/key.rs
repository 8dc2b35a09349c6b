//! Cache key derivation

use crate::error::Result;
use remote_fetcher::{parse_locator, Url};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request-shaping options that change the bytes a caller receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Keep the raw body instead of base64-encoding it
    pub as_bytes: bool,
}

impl FetchOptions {
    pub fn bytes() -> Self {
        Self { as_bytes: true }
    }

    pub fn base64() -> Self {
        Self { as_bytes: false }
    }
}

/// Deterministic identifier for a (locator, options) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a locator and its shaping options
    ///
    /// The locator is normalized through URL parsing, so equivalent spellings
    /// such as `http://Example.com` and `http://example.com/` share a key.
    pub fn build(locator: &str, options: FetchOptions) -> Result<Self> {
        resolve(locator, options).map(|(_, key)| key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_url(url: &Url, options: FetchOptions) -> Self {
        CacheKey(format!("{}|as_bytes={}", url, options.as_bytes))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate a locator and derive both its URL and its key
pub(crate) fn resolve(locator: &str, options: FetchOptions) -> Result<(Url, CacheKey)> {
    let url = parse_locator(locator)?;
    let key = CacheKey::from_url(&url, options);
    Ok((url, key))
}
