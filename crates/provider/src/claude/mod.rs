//! Claude (Anthropic) Messages API adapter.

pub use request::Request;

use crate::http::HttpProvider;
use anyhow::Result;
use ocore::Error;
use reqwest::Client;

mod provider;
mod request;
mod stream;

const ANTHROPIC_API: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude (Anthropic) provider.
#[derive(Clone, Debug)]
pub struct Claude {
    transport: HttpProvider,
}

impl Claude {
    /// Create an adapter for the Anthropic API.
    pub fn anthropic(client: Client, key: &str) -> Result<Self> {
        Self::with_endpoint(client, key, ANTHROPIC_API)
    }

    /// Create an adapter for a custom Anthropic-compatible endpoint.
    pub fn custom(client: Client, key: &str, endpoint: &str) -> Result<Self> {
        Self::with_endpoint(client, key, endpoint)
    }

    fn with_endpoint(client: Client, key: &str, endpoint: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::Configuration("claude provider requires an api key".into()).into());
        }
        let transport = HttpProvider::custom_header(client, "x-api-key", key, endpoint)?
            .with_header("anthropic-version", ANTHROPIC_VERSION)?;
        Ok(Self { transport })
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }
}
