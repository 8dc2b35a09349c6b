//! HTTP retrieval of remote resources

use crate::error::{FetchError, Result};
use crate::types::{FetchedResource, FetcherConfig, DEFAULT_CONTENT_TYPE};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::future::Future;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use url::Url;

/// Retrieves a resource and normalizes it into a [`FetchedResource`]
///
/// Implementations must not cache; every call performs a fresh retrieval.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedResource>> + Send;
}

/// Parse a locator into an absolute HTTP(S) URL
pub fn parse_locator(locator: &str) -> Result<Url> {
    let invalid = |reason: &str| FetchError::InvalidUrl {
        url: locator.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(invalid("locator is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme: {}", other))),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(url)
}

/// [`Fetcher`] backed by a `reqwest` client issuing plain GET requests
pub struct HttpFetcher {
    client: Client,
    expected_content_type: Option<String>,
}

impl HttpFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> std::result::Result<Self, reqwest::Error> {
        Self::with_config(FetcherConfig::default())
    }

    /// Create a fetcher with custom timeout, user agent and content-type guard
    pub fn with_config(config: FetcherConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;

        Ok(Self {
            client,
            expected_content_type: config.expected_content_type,
        })
    }

    /// Download a file's bytes without any content-type interpretation
    pub async fn download(&self, locator: &str) -> Result<Vec<u8>> {
        let url = parse_locator(locator)?;
        let response = self.send(&url).await?;
        read_body(&url, response).await
    }

    /// Download into a fresh temporary file
    ///
    /// The file is removed when the returned handle is dropped.
    pub async fn download_to_temp(&self, locator: &str) -> Result<NamedTempFile> {
        let data = self.download(locator).await?;
        let file = NamedTempFile::new()?;
        tokio::fs::write(file.path(), &data).await?;

        debug!(path = ?file.path(), size = data.len(), "Downloaded to temporary file");
        Ok(file)
    }

    async fn send(&self, url: &Url) -> Result<Response> {
        debug!(url = %url, "Fetching remote resource");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::network(url.as_str(), &e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url = %url, "Upstream returned non-success status");
            return Err(FetchError::Network {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: format!("upstream returned status {}", status),
            });
        }

        Ok(response)
    }

    fn content_type(&self, url: &Url, response: &Response) -> Result<String> {
        let content_type = match response.headers().get(CONTENT_TYPE) {
            Some(value) => value
                .to_str()
                .map_err(|e| FetchError::Decode {
                    url: url.to_string(),
                    reason: format!("unreadable content-type header: {}", e),
                })?
                .to_string(),
            None => DEFAULT_CONTENT_TYPE.to_string(),
        };

        if let Some(ref expected) = self.expected_content_type {
            if !content_type.starts_with(expected.as_str()) {
                return Err(FetchError::Decode {
                    url: url.to_string(),
                    reason: format!(
                        "unexpected content type {} (expected {}*)",
                        content_type, expected
                    ),
                });
            }
        }

        Ok(content_type)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedResource> {
        let response = self.send(url).await?;
        let content_type = self.content_type(url, &response)?;
        let bytes = read_body(url, response).await?;

        debug!(
            url = %url,
            size = bytes.len(),
            content_type = %content_type,
            "Fetched remote resource"
        );

        Ok(FetchedResource {
            content_type,
            bytes,
        })
    }
}

async fn read_body(url: &Url, response: Response) -> Result<Vec<u8>> {
    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::network(url.as_str(), &e))?;
    Ok(body.to_vec())
}
