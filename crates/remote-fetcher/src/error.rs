//! Error types for the remote fetcher

use std::fmt;

/// Errors produced while retrieving a remote resource
///
/// Variants carry rendered messages rather than the underlying client errors
/// so a single failure can be cloned out to several waiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The locator could not be parsed as an HTTP(S) URL
    InvalidUrl { url: String, reason: String },
    /// Unreachable host, timeout, or a non-success status
    Network {
        url: String,
        status: Option<u16>,
        reason: String,
    },
    /// The response could not be interpreted as the expected content
    Decode { url: String, reason: String },
    /// Writing a download to local storage failed
    Io(String),
}

impl FetchError {
    pub(crate) fn network(url: &str, err: &reqwest::Error) -> Self {
        FetchError::Network {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::InvalidUrl { url, reason } => {
                write!(f, "Invalid URL {}: {}", url, reason)
            }
            FetchError::Network {
                url,
                status: Some(status),
                reason,
            } => write!(f, "Network error fetching {} (status {}): {}", url, status, reason),
            FetchError::Network {
                url,
                status: None,
                reason,
            } => write!(f, "Network error fetching {}: {}", url, reason),
            FetchError::Decode { url, reason } => {
                write!(f, "Decode error for {}: {}", url, reason)
            }
            FetchError::Io(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_display_with_status() {
        let err = FetchError::Network {
            url: "https://example.com/a.png".to_string(),
            status: Some(404),
            reason: "not found".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Network error fetching https://example.com/a.png (status 404): not found"
        );
    }

    #[test]
    fn test_decode_error_display() {
        let err = FetchError::Decode {
            url: "https://example.com/a".to_string(),
            reason: "unexpected content type text/html".to_string(),
        };
        assert!(format!("{}", err).contains("unexpected content type"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: FetchError = io.into();
        assert_eq!(err, FetchError::Io("disk full".to_string()));
    }

    #[test]
    fn test_error_is_clone() {
        let err = FetchError::InvalidUrl {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert_eq!(err.clone(), err);
    }
}
