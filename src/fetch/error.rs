//! Error types for the fetch module.
//!
//! Every variant carries the URL (or staging path) it relates to so that the
//! message is useful on its own in logs and in the error response body.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while fetching an image from a remote URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provided URL is malformed or not an absolute http(s) URL.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL string.
        url: String,
        /// Why the URL was rejected.
        reason: &'static str,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed to fetch.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before the body was fully received.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Upstream answered with anything other than 200 OK.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned the status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase, when the status has one.
        reason: Option<&'static str>,
    },

    /// Upstream answered 200 OK with a zero-length body.
    #[error("empty response body from {url}")]
    EmptyBody {
        /// The URL that returned no bytes.
        url: String,
    },

    /// Response body is larger than the configured limit.
    #[error("response from {url} exceeds the {limit} byte limit")]
    TooLarge {
        /// The URL whose body was too large.
        url: String,
        /// Configured maximum body size.
        limit: u64,
        /// Content-Length announced by the upstream, if it was the trigger.
        declared: Option<u64>,
    },

    /// File system error while staging the body to disk.
    #[error("IO error staging image at {path}: {source}")]
    Staging {
        /// The staging path (or directory) where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason,
        }
    }

    /// Creates a network error, promoting reqwest timeouts to [`FetchError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::timeout(url);
        }
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16, reason: Option<&'static str>) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
            reason,
        }
    }

    /// Creates an empty body error.
    pub fn empty_body(url: impl Into<String>) -> Self {
        Self::EmptyBody { url: url.into() }
    }

    /// Creates a body size error.
    pub fn too_large(url: impl Into<String>, limit: u64, declared: Option<u64>) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit,
            declared,
        }
    }

    /// Creates a staging IO error.
    pub fn staging(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the failure was a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/qr.png");
        assert!(error.to_string().contains("timeout"));
        assert!(error.to_string().contains("https://example.com/qr.png"));
        assert!(error.is_timeout());
    }

    #[test]
    fn test_fetch_error_http_status_display() {
        let error = FetchError::http_status("https://example.com/qr.png", 404, Some("Not Found"));
        let msg = error.to_string();
        assert!(msg.contains("404"), "Expected '404' in: {msg}");
        assert!(
            msg.contains("https://example.com/qr.png"),
            "Expected URL in: {msg}"
        );
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_fetch_error_invalid_url_display() {
        let error = FetchError::invalid_url("not-a-url", "not an absolute URL");
        let msg = error.to_string();
        assert!(
            msg.contains("invalid URL"),
            "Expected 'invalid URL' in: {msg}"
        );
        assert!(msg.contains("not-a-url"), "Expected URL in: {msg}");
        assert!(msg.contains("absolute"), "Expected reason in: {msg}");
    }

    #[test]
    fn test_fetch_error_too_large_display() {
        let error = FetchError::too_large("https://example.com/huge.png", 1024, Some(4096));
        let msg = error.to_string();
        assert!(msg.contains("1024"), "Expected limit in: {msg}");
    }

    #[test]
    fn test_fetch_error_staging_display() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = FetchError::staging(PathBuf::from("/tmp/qrdecode-x.img"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/qrdecode-x.img"), "Expected path in: {msg}");
    }
}
