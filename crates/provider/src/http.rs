//! Shared HTTP transport for the vendor adapters.
//!
//! `HttpProvider` wraps a `reqwest::Client` with pre-configured headers
//! and endpoint URL. Provides `post()` for non-streaming calls,
//! `stream_sse()` for Server-Sent Events, and `stream_lines()` for
//! NDJSON vendors (Ollama). Upstream error statuses are mapped to the
//! gateway error taxonomy here, once, for every adapter.

use anyhow::Result;
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use ocore::Error;
use reqwest::{
    Client, Method,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::Serialize;

/// Shared HTTP transport for vendor adapters.
#[derive(Clone, Debug)]
pub struct HttpProvider {
    client: Client,
    headers: HeaderMap,
    endpoint: String,
}

impl HttpProvider {
    /// Create a transport with Bearer token authentication.
    pub fn bearer(client: Client, key: &str, endpoint: &str) -> Result<Self> {
        let mut headers = json_headers();
        headers.insert(header::AUTHORIZATION, format!("Bearer {key}").parse()?);
        Ok(Self {
            client,
            headers,
            endpoint: endpoint.to_owned(),
        })
    }

    /// Create a transport without authentication (e.g. Ollama).
    pub fn no_auth(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            headers: json_headers(),
            endpoint: endpoint.to_owned(),
        }
    }

    /// Create a transport with a custom header for authentication
    /// (e.g. Anthropic uses `x-api-key`).
    pub fn custom_header(
        client: Client,
        header_name: &str,
        header_value: &str,
        endpoint: &str,
    ) -> Result<Self> {
        let mut headers = json_headers();
        headers.insert(
            header_name.parse::<HeaderName>()?,
            header_value.parse::<HeaderValue>()?,
        );
        Ok(Self {
            client,
            headers,
            endpoint: endpoint.to_owned(),
        })
    }

    /// Add an extra header (e.g. `anthropic-version`).
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.headers
            .insert(name.parse::<HeaderName>()?, value.parse::<HeaderValue>()?);
        Ok(self)
    }

    /// POST to the configured endpoint and return the response body.
    pub async fn post(&self, body: &impl Serialize) -> Result<String> {
        self.post_url(&self.endpoint, body).await
    }

    /// POST to an explicit URL (vendors with per-model endpoints).
    pub async fn post_url(&self, url: &str, body: &impl Serialize) -> Result<String> {
        tracing::trace!("request: {}", serde_json::to_string(body)?);
        let response = self
            .client
            .request(Method::POST, url)
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::provider(None, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::provider(Some(status.as_u16()), e.to_string()))?;
        tracing::trace!("response: {text}");

        if !status.is_success() {
            return Err(Error::from_status(status.as_u16(), &text).into());
        }
        Ok(text)
    }

    /// Stream an SSE response from the configured endpoint, yielding the
    /// payload of each `data:` line. The `[DONE]` sentinel is yielded
    /// through so callers can observe explicit termination.
    pub fn stream_sse(&self, body: &impl Serialize) -> impl Stream<Item = Result<String>> + Send {
        self.stream_sse_url(self.endpoint.clone(), body)
    }

    /// Stream an SSE response from an explicit URL.
    pub fn stream_sse_url(
        &self,
        url: String,
        body: &impl Serialize,
    ) -> impl Stream<Item = Result<String>> + Send {
        if let Ok(body) = serde_json::to_string(body) {
            tracing::trace!("request: {}", body);
        }
        let request = self
            .client
            .request(Method::POST, url)
            .headers(self.headers.clone())
            .json(body);

        try_stream! {
            let response = request.send().await.map_err(|e| Error::provider(None, e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                Err(Error::from_status(status.as_u16(), &text))?;
            } else {
                let mut stream = response.bytes_stream();
                let mut buf = String::new();
                while let Some(next) = stream.next().await {
                    let bytes = next.map_err(|e| Error::provider(None, e.to_string()))?;
                    buf.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = buf.find("\n\n") {
                        let block = buf[..pos].to_owned();
                        buf = buf[pos + 2..].to_owned();
                        for data in block_data(&block) {
                            yield data;
                        }
                    }
                }
                // Flush any trailing block the vendor did not terminate.
                if !buf.trim().is_empty() {
                    for data in block_data(&buf) {
                        yield data;
                    }
                }
            }
        }
    }

    /// Stream an NDJSON response, yielding one line at a time.
    pub fn stream_lines(&self, body: &impl Serialize) -> impl Stream<Item = Result<String>> + Send {
        if let Ok(body) = serde_json::to_string(body) {
            tracing::trace!("request: {}", body);
        }
        let request = self
            .client
            .request(Method::POST, &self.endpoint)
            .headers(self.headers.clone())
            .json(body);

        try_stream! {
            let response = request.send().await.map_err(|e| Error::provider(None, e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                Err(Error::from_status(status.as_u16(), &text))?;
            } else {
                let mut stream = response.bytes_stream();
                let mut buf = String::new();
                while let Some(next) = stream.next().await {
                    let bytes = next.map_err(|e| Error::provider(None, e.to_string()))?;
                    buf.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = buf.find('\n') {
                        let line = buf[..pos].trim().to_owned();
                        buf = buf[pos + 1..].to_owned();
                        if !line.is_empty() {
                            yield line;
                        }
                    }
                }
                if !buf.trim().is_empty() {
                    yield buf.trim().to_owned();
                }
            }
        }
    }

    /// Get the endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get a reference to the headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Build base headers with JSON content-type and accept.
fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Extract the `data:` payloads from one SSE block.
fn block_data(block: &str) -> Vec<String> {
    block
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.trim().to_owned())
        .filter(|data| !data.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_data_extracts_payloads() {
        let block = "event: delta\ndata: {\"a\":1}";
        assert_eq!(block_data(block), vec!["{\"a\":1}"]);
    }

    #[test]
    fn block_data_skips_comments_and_blank_lines() {
        let block = ": keep-alive\n\ndata: [DONE]";
        assert_eq!(block_data(block), vec!["[DONE]"]);
    }
}
