//! OpenAI-compatible chat completions adapter.
//!
//! One adapter covers every vendor speaking the OpenAI wire dialect:
//! OpenAI itself, Grok, Qwen, DeepSeek, and anything reachable through a
//! custom base URL.

pub use request::Request;

use crate::http::HttpProvider;
use anyhow::Result;
use ocore::Error;
use reqwest::Client;

mod provider;
mod request;
mod stream;

const OPENAI_API: &str = "https://api.openai.com/v1/chat/completions";
const GROK_API: &str = "https://api.x.ai/v1/chat/completions";
const QWEN_API: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";
const DEEPSEEK_API: &str = "https://api.deepseek.com/chat/completions";

/// OpenAI-compatible provider.
#[derive(Clone, Debug)]
pub struct OpenAi {
    transport: HttpProvider,
}

impl OpenAi {
    /// Create an adapter for the OpenAI API.
    pub fn api(client: Client, key: &str) -> Result<Self> {
        Self::with_endpoint(client, key, OPENAI_API)
    }

    /// Create an adapter for the Grok (xAI) API.
    pub fn grok(client: Client, key: &str) -> Result<Self> {
        Self::with_endpoint(client, key, GROK_API)
    }

    /// Create an adapter for the Qwen (DashScope) API.
    pub fn qwen(client: Client, key: &str) -> Result<Self> {
        Self::with_endpoint(client, key, QWEN_API)
    }

    /// Create an adapter for the DeepSeek API.
    pub fn deepseek(client: Client, key: &str) -> Result<Self> {
        Self::with_endpoint(client, key, DEEPSEEK_API)
    }

    /// Create an adapter for a custom OpenAI-compatible endpoint.
    pub fn custom(client: Client, key: &str, endpoint: &str) -> Result<Self> {
        Self::with_endpoint(client, key, endpoint)
    }

    fn with_endpoint(client: Client, key: &str, endpoint: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(Error::Configuration(
                "openai-compatible provider requires an api key".into(),
            )
            .into());
        }
        Ok(Self {
            transport: HttpProvider::bearer(client, key, endpoint)?,
        })
    }

    /// The configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }
}
