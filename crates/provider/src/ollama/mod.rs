//! Ollama local chat API adapter.
//!
//! Speaks the native `/api/chat` protocol: no authentication, NDJSON
//! streaming, and the reply under `message.content`.

pub use request::Request;

use crate::http::HttpProvider;
use anyhow::Result;
use reqwest::Client;

mod provider;
mod request;

const OLLAMA_API: &str = "http://localhost:11434/api/chat";

/// Ollama local provider.
#[derive(Clone, Debug)]
pub struct Ollama {
    transport: HttpProvider,
}

impl Ollama {
    /// Create an adapter for a local Ollama daemon.
    pub fn local(client: Client) -> Self {
        Self {
            transport: HttpProvider::no_auth(client, OLLAMA_API),
        }
    }

    /// Create an adapter for a remote Ollama endpoint.
    pub fn custom(client: Client, endpoint: &str) -> Result<Self> {
        Ok(Self {
            transport: HttpProvider::no_auth(client, endpoint),
        })
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }
}
