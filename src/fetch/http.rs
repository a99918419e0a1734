// src/fetch/http.rs
// =============================================================================
// This module downloads pages over HTTP.
//
// Key functionality:
// - One shared reqwest Client (connection pooling, per-request timeout)
// - GET requests only, the crawler needs the body
// - Non-2xx answers are errors, but kept distinct from transport failures
// - reqwest errors are sorted into a small FetchError taxonomy
//
// Nothing here decides what a failure means for a crawl. The crawler logs the
// error and moves on to the next URL.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::{Page, PageFetcher};
use crate::config::CrawlSettings;

// Why a page could not be fetched
//
// Every variant is recoverable: the crawler skips the page and continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The per-request timeout expired
    #[error("request timed out")]
    Timeout,
    /// DNS failure, refused connection, reset, ...
    #[error("connection failed: {0}")]
    Connect(String),
    /// The server answered, but not with a 2xx status
    #[error("HTTP {0}")]
    Status(u16),
    /// The URL could not even be turned into a request (missing scheme, ...)
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("too many redirects")]
    TooManyRedirects,
    /// Headers arrived but the body could not be read or decoded
    #[error("failed to read body: {0}")]
    Body(String),
    #[error("{0}")]
    Other(String),
}

// A PageFetcher backed by reqwest
//
// Client is cheap to clone (it's an Arc internally), so the fetcher can be
// shared by every organization task in a batch.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    // Builds the shared client from the crawl settings
    //
    // Returns an error only if the TLS backend cannot be initialised.
    pub fn new(settings: &CrawlSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        // Catch "team.html"-style leftovers before reqwest does
        if let Err(e) = Url::parse(url) {
            return Err(FetchError::InvalidUrl(format!("{}: {}", url, e)));
        }

        let response = self.client.get(url).send().await.map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        debug!(url = %url, bytes = body.len(), "fetched page");

        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

// Categorizes the different error types from reqwest
//
// reqwest errors can happen for many reasons:
// - Network timeout
// - DNS resolution failure
// - SSL certificate issues
// - Too many redirects
// - A URL reqwest cannot build a request for
fn categorize_error(error: reqwest::Error) -> FetchError {
    let error_string = error.to_string();

    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_builder() {
        FetchError::InvalidUrl(error_string)
    } else if error.is_connect() {
        FetchError::Connect(error_string)
    } else if error_string.contains("certificate") || error_string.contains("ssl") {
        FetchError::Connect(format!("SSL error: {}", error_string))
    } else {
        FetchError::Other(error_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relative_url_is_rejected_without_network() {
        let fetcher = HttpFetcher::new(&CrawlSettings::default()).unwrap();
        let result = fetcher.fetch("about/team.html").await;
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(FetchError::Status(404).to_string(), "HTTP 404");
        assert_eq!(FetchError::Timeout.to_string(), "request timed out");
    }
}
