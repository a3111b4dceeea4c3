//! Gemini (Google) generateContent API adapter.
//!
//! Authentication is a `key` query parameter and the endpoint is
//! per-model, so this adapter builds its URLs per request instead of
//! pinning one endpoint on the transport.

pub use request::Request;

use crate::http::HttpProvider;
use anyhow::Result;
use ocore::Error;
use reqwest::Client;

mod provider;
mod request;

const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini (Google) provider.
#[derive(Clone, Debug)]
pub struct Gemini {
    transport: HttpProvider,
    key: String,
    base: String,
}

impl Gemini {
    /// Create an adapter for the Google Generative Language API.
    pub fn google(client: Client, key: &str) -> Result<Self> {
        Self::with_base(client, key, GEMINI_API)
    }

    /// Create an adapter with a custom base URL.
    pub fn custom(client: Client, key: &str, base: &str) -> Result<Self> {
        Self::with_base(client, key, base)
    }

    fn with_base(client: Client, key: &str, base: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::Configuration("gemini provider requires an api key".into()).into());
        }
        Ok(Self {
            transport: HttpProvider::no_auth(client, base),
            key: key.to_owned(),
            base: base.trim_end_matches('/').to_owned(),
        })
    }

    /// URL for a non-streaming generateContent call.
    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent?key={}", self.base, model, self.key)
    }

    /// URL for a streaming generateContent call (SSE framing).
    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base, model, self.key
        )
    }
}
