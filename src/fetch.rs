//! HTTP fetching of upstream CSV files
//!
//! The [`Fetch`] trait is the only way the cache reaches the network, which
//! lets tests drive acquisition with scripted responses.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::{Error, Result};

/// Default timeout for a single download
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Something that can GET a URL and return its body as text
pub trait Fetch {
    /// Fetches `url`, returning the body on a 2xx response
    fn fetch(&self, url: &str) -> Result<String>;
}

/// Blocking HTTP fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a fetcher with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Creates a fetcher around an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "downloading");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(url, format!("HTTP status {}", status)));
        }

        let text = response.text().map_err(|e| Error::network(url, e))?;
        if text.trim().is_empty() {
            return Err(Error::network(url, "empty response body"));
        }

        tracing::debug!(url, bytes = text.len(), "download complete");
        Ok(text)
    }
}
