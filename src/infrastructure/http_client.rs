//! HTTP client shared by the catalog browser, image downloader and the
//! visual question answering client
//!
//! Requests are single attempts; callers bound them with their own waits
//! and decide whether a failure skips the item.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use crate::infrastructure::config::HttpConfig;

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub follow_redirects: bool,
}

impl HttpClientConfig {
    pub fn from_http_config(http: &HttpConfig) -> Self {
        Self {
            timeout_seconds: http.timeout_secs,
            user_agent: http.user_agent.clone(),
            follow_redirects: true,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from_http_config(&HttpConfig::default())
    }
}

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    pub fn from_http_config(http: &HttpConfig) -> Result<Self> {
        Self::with_config(HttpClientConfig::from_http_config(http))
    }

    pub(crate) fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a URL, failing on any non-success status
    pub async fn fetch_response(&self, url: &str) -> Result<Response> {
        debug!("🌐 HTTP GET: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        if !response.status().is_success() {
            error!("❌ HTTP error {}: {}", response.status(), url);
            return Err(anyhow!("HTTP error {}: {}", response.status(), url));
        }
        Ok(response)
    }

    /// Fetch a page body as text
    pub async fn fetch_html_string(&self, url: &str) -> Result<String> {
        let html = self
            .fetch_response(url)
            .await?
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?;

        if html.is_empty() {
            return Err(anyhow!("Empty response from {}", url));
        }
        Ok(html)
    }

    /// Fetch a binary body such as an image
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let bytes = self
            .fetch_response(url)
            .await?
            .bytes()
            .await
            .with_context(|| format!("Failed to read body of {url}"))?;
        Ok(bytes.to_vec())
    }

    /// POST a binary body with query parameters and decode a JSON answer
    pub async fn post_bytes_for_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<T> {
        debug!("🌐 HTTP POST: {} ({} bytes)", url, body.len());
        let response = self
            .client
            .post(url)
            .query(query)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("HTTP error {}: {}", status, url));
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("Invalid JSON answer from {url}"))
    }
}
