//! HTTP client wrapper for fetching images.
//!
//! This module provides the [`ImageFetcher`] which validates the source URL,
//! issues a bounded GET and streams the body into a [`FetchedImage`].

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, FETCH_TIMEOUT_SECS, MAX_IMAGE_BYTES};
use super::error::FetchError;
use super::staging::{FetchedImage, StagingSink, StagingStrategy};
use crate::user_agent;

/// Fetch behaviour shared by every request served by one [`ImageFetcher`].
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
    /// Total timeout for one fetch, body included.
    pub timeout: Duration,
    /// Largest accepted response body in bytes.
    pub max_bytes: u64,
    /// Where the body is kept until it is decoded.
    pub staging: StagingStrategy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            max_bytes: MAX_IMAGE_BYTES,
            staging: StagingStrategy::Memory,
        }
    }
}

/// HTTP client for fetching source images.
///
/// Created once and shared by all requests; it holds only the connection pool
/// and immutable configuration.
///
/// # Example
///
/// ```no_run
/// use qrdecode_core::fetch::{FetchConfig, ImageFetcher};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = ImageFetcher::new(FetchConfig::default())?;
/// let image = fetcher.fetch("https://example.com/qr.png").await?;
/// println!("fetched {} bytes", image.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    config: FetchConfig,
}

impl ImageFetcher {
    /// Creates a fetcher with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .gzip(true)
            .user_agent(user_agent::default_fetch_user_agent())
            .build()
            .map_err(|source| FetchError::Client { source })?;
        Ok(Self { client, config })
    }

    /// Returns the configuration this fetcher was built with.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches `url` and returns the complete body.
    ///
    /// Only a `200 OK` response is a success. The body is either fully
    /// received or the fetch fails; any partially staged bytes are released
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if:
    /// - The URL is not an absolute http(s) URL
    /// - The request fails (network error, timeout)
    /// - The server returns any status other than 200
    /// - The body is empty or larger than `max_bytes`
    /// - Staging to disk fails
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let parsed = validate_image_url(url)?;
        debug!("starting fetch");

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(status = status.as_u16(), "upstream rejected fetch");
            return Err(FetchError::http_status(
                url,
                status.as_u16(),
                status.canonical_reason(),
            ));
        }

        let max_bytes = self.config.max_bytes;
        let declared = response.content_length();
        if let Some(declared) = declared
            && declared > max_bytes
        {
            return Err(FetchError::too_large(url, max_bytes, Some(declared)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string);

        let mut sink = StagingSink::open(&self.config.staging, declared)?;
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;
            received += chunk.len() as u64;
            if received > max_bytes {
                return Err(FetchError::too_large(url, max_bytes, None));
            }
            sink.write(&chunk).await?;
        }

        if received == 0 {
            return Err(FetchError::empty_body(url));
        }

        let image = sink.finish(received, content_type).await?;
        info!(
            bytes = received,
            content_type = image.content_type().unwrap_or("-"),
            staged = image.staged_path().is_some(),
            "fetch complete"
        );
        Ok(image)
    }
}

/// Validates that `url` is an absolute http(s) URL with a host.
///
/// Local file paths, `data:` URIs and relative references are rejected.
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] describing the first failed check.
pub fn validate_image_url(url: &str) -> Result<Url, FetchError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(FetchError::invalid_url(url, "URL is empty"));
    }
    let parsed =
        Url::parse(trimmed).map_err(|_| FetchError::invalid_url(url, "not an absolute URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(FetchError::invalid_url(url, "only http and https URLs are accepted"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::invalid_url(url, "URL has no host"));
    }
    Ok(parsed)
}
