//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - The politeness delay applied before every request
//! - GET requests returning body and status code
//! - Error classification for network-level failures

use crate::config::CrawlerConfig;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Network-level fetch failures
///
/// A response with a non-success status is not an error; it is returned as
/// a [`FetchedPage`] carrying that status.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL {0}")]
    InvalidUrl(String),

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Fetch scheduler closed")]
    SchedulerClosed,
}

impl FetchError {
    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            FetchError::Connect {
                url: url.to_string(),
                message: error.to_string(),
            }
        } else if error.is_builder() {
            FetchError::InvalidUrl(url.to_string())
        } else {
            FetchError::Request {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Result of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Response body
    pub body: String,
}

impl FetchedPage {
    /// Returns true if the response is (or may be) an HTML document
    pub fn is_html(&self) -> bool {
        match &self.content_type {
            Some(content_type) => {
                let content_type = content_type.to_ascii_lowercase();
                content_type.contains("text/html") || content_type.contains("xhtml")
            }
            None => true,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited page fetcher
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    referrer: String,
    delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            referrer: config.referrer.clone(),
            delay: Duration::from_millis(config.delay_ms),
        })
    }

    /// Fetches a URL after the politeness delay
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(FetchedPage)` - Any HTTP response, including 4xx and 5xx
    /// * `Err(FetchError)` - Timeout, DNS, connection or malformed URL failure
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut request = self.client.get(url);
        if !self.referrer.is_empty() {
            request = request.header(REFERER, self.referrer.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        tracing::debug!("Fetched {} ({})", final_url, status);

        Ok(FetchedPage {
            url: final_url,
            status,
            content_type,
            body,
        })
    }
}
