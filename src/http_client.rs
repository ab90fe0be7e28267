//! HTTP client abstraction for talking to LLM providers.
//!
//! This module provides a trait-based abstraction over HTTP clients, enabling
//! dependency injection so providers can be tested without network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Trait for HTTP communication with provider APIs.
///
/// # Example
///
/// ```ignore
/// use how::http_client::{HttpClient, ReqwestHttpClient};
///
/// let client = ReqwestHttpClient::new();
/// let response = client.post_json(
///     "https://api.example.com/endpoint",
///     &[("content-type", "application/json")],
///     &serde_json::json!({"key": "value"}),
/// ).await?;
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a POST request with a JSON body and returns the response text.
    ///
    /// Non-2xx responses are not errors here; providers inspect the body for
    /// their own error envelopes.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<String>;

    /// Sends a POST request and hands each received body chunk to `on_chunk`
    /// as it arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with a
    /// non-2xx status (the error message carries the response body).
    async fn post_json_streaming(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
        on_chunk: &mut (dyn for<'a> FnMut(&'a [u8]) + Send),
    ) -> Result<()>;
}

/// HTTP client implementation using reqwest.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a new HTTP client with a generous request timeout.
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<String> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request.json(body).send().await?;
        debug!("POST {} -> {}", url, response.status());
        Ok(response.text().await?)
    }

    async fn post_json_streaming(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
        on_chunk: &mut (dyn for<'a> FnMut(&'a [u8]) + Send),
    ) -> Result<()> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let mut response = request.json(body).send().await?;
        let status = response.status();
        debug!("POST (streaming) {} -> {}", url, status);

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Request failed with status {}: {}", status, text));
        }

        while let Some(chunk) = response.chunk().await? {
            on_chunk(&chunk[..]);
        }
        Ok(())
    }
}
