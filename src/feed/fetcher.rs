use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_podcast, ParseError};
use super::types::PodcastData;

/// Errors that can occur while loading the upstream feed.
///
/// These cover the whole refresh: transport problems, HTTP errors from the
/// feed host, and feeds that do not parse.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    UpstreamStatus(u16),
    /// Response body exceeded the configured size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Feed XML had no usable channel
    #[error("Malformed feed: {0}")]
    Malformed(#[from] ParseError),
}

/// Fetches the upstream RSS document.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    max_bytes: usize,
}

impl FeedFetcher {
    /// `client` should already carry the user-agent header.
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
            max_bytes,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Downloads the feed body as text.
    ///
    /// A single attempt: failures are returned to the caller without retry.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Network`] - Connection or TLS errors
    /// - [`FeedError::Timeout`] - Request exceeded the configured timeout
    /// - [`FeedError::UpstreamStatus`] - Non-2xx HTTP response
    /// - [`FeedError::ResponseTooLarge`] - Body exceeded the size limit
    /// - [`FeedError::IncompleteResponse`] - Body shorter than Content-Length
    pub async fn fetch_xml(&self) -> Result<String, FeedError> {
        tracing::info!(url = %self.url, "Fetching RSS feed");

        let response = tokio::time::timeout(self.timeout, self.client.get(&self.url).send())
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))?
            .map_err(FeedError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, status = %status, "Feed host returned error status");
            return Err(FeedError::UpstreamStatus(status.as_u16()));
        }

        // The body read shares the same budget as the request itself.
        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, self.max_bytes))
            .await
            .map_err(|_| FeedError::Timeout(self.timeout))??;

        // Bytes that are not UTF-8 become U+FFFD instead of failing the refresh.
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                tracing::debug!(url = %self.url, "Feed body is not valid UTF-8, replacing bad bytes");
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    /// Fetches, parses, normalizes, and orders the feed.
    pub async fn load(&self) -> Result<PodcastData, FeedError> {
        let xml = self.fetch_xml().await?;
        let data = parse_podcast(&xml)?;

        tracing::info!(
            url = %self.url,
            episodes = data.episodes.len(),
            "Parsed episodes from RSS feed"
        );

        Ok(data)
    }
}

async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FeedError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FeedError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FeedError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FeedError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
