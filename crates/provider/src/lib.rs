//! Upstream vendor adapters for the orca completion gateway.
//!
//! Each adapter translates the normalized [`ocore::Request`] into its
//! vendor's wire format and the vendor's response back into the
//! normalized result or event feed. Shape-specific parsing never leaks
//! past this crate.

pub use claude::Claude;
pub use config::{ProviderConfig, ProviderKind};
pub use gemini::Gemini;
pub use http::HttpProvider;
pub use ollama::Ollama;
pub use openai::OpenAi;
pub use replicate::Replicate;

use anyhow::Result;
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use ocore::{Completion, Model, Request, StreamEvent};

pub mod claude;
mod config;
pub mod gemini;
mod http;
mod metrics;
pub mod ollama;
pub mod openai;
pub mod replicate;

/// Unified provider enum.
///
/// The gateway constructs the appropriate variant per configured
/// provider entry; the engine is monomorphized on `Provider`.
#[derive(Clone, Debug)]
pub enum Provider {
    /// OpenAI-compatible API (covers OpenAI, Grok, Qwen, DeepSeek, custom).
    OpenAi(OpenAi),
    /// Anthropic Messages API.
    Claude(Claude),
    /// Google generateContent API.
    Gemini(Gemini),
    /// Ollama local API.
    Ollama(Ollama),
    /// Replicate predictions API (async jobs).
    Replicate(Replicate),
}

/// Construct a [`Provider`] from config and a shared HTTP client.
pub fn build_provider(config: &ProviderConfig, client: reqwest::Client) -> Result<Provider> {
    config.validate()?;
    let api_key = config.api_key.as_deref().unwrap_or("");
    let base_url = config.base_url.as_deref();

    let provider = match config.kind {
        ProviderKind::OpenAi => match base_url {
            Some(url) => Provider::OpenAi(OpenAi::custom(client, api_key, url)?),
            None => Provider::OpenAi(OpenAi::api(client, api_key)?),
        },
        ProviderKind::Grok => match base_url {
            Some(url) => Provider::OpenAi(OpenAi::custom(client, api_key, url)?),
            None => Provider::OpenAi(OpenAi::grok(client, api_key)?),
        },
        ProviderKind::Qwen => match base_url {
            Some(url) => Provider::OpenAi(OpenAi::custom(client, api_key, url)?),
            None => Provider::OpenAi(OpenAi::qwen(client, api_key)?),
        },
        ProviderKind::DeepSeek => match base_url {
            Some(url) => Provider::OpenAi(OpenAi::custom(client, api_key, url)?),
            None => Provider::OpenAi(OpenAi::deepseek(client, api_key)?),
        },
        ProviderKind::Claude => match base_url {
            Some(url) => Provider::Claude(Claude::custom(client, api_key, url)?),
            None => Provider::Claude(Claude::anthropic(client, api_key)?),
        },
        ProviderKind::Gemini => match base_url {
            Some(url) => Provider::Gemini(Gemini::custom(client, api_key, url)?),
            None => Provider::Gemini(Gemini::google(client, api_key)?),
        },
        ProviderKind::Ollama => match base_url {
            Some(url) => Provider::Ollama(Ollama::custom(client, url)?),
            None => Provider::Ollama(Ollama::local(client)),
        },
        ProviderKind::Replicate => {
            let webhook = config.webhook_url.as_deref().unwrap_or("");
            match base_url {
                Some(url) => Provider::Replicate(Replicate::custom(client, api_key, webhook, url)?),
                None => Provider::Replicate(Replicate::api(client, api_key, webhook)?),
            }
        }
    };
    Ok(provider)
}

impl Model for Provider {
    async fn send(&self, request: &Request) -> Result<Completion> {
        match self {
            Self::OpenAi(p) => p.send(request).await,
            Self::Claude(p) => p.send(request).await,
            Self::Gemini(p) => p.send(request).await,
            Self::Ollama(p) => p.send(request).await,
            Self::Replicate(p) => p.send(request).await,
        }
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        let this = self.clone();
        try_stream! {
            match this {
                Provider::OpenAi(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(event) = stream.next().await {
                        yield event?;
                    }
                }
                Provider::Claude(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(event) = stream.next().await {
                        yield event?;
                    }
                }
                Provider::Gemini(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(event) = stream.next().await {
                        yield event?;
                    }
                }
                Provider::Ollama(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(event) = stream.next().await {
                        yield event?;
                    }
                }
                Provider::Replicate(p) => {
                    let mut stream = std::pin::pin!(p.stream(request));
                    while let Some(event) = stream.next().await {
                        yield event?;
                    }
                }
            }
        }
    }

    fn streams(&self) -> bool {
        match self {
            Self::Replicate(p) => p.streams(),
            _ => true,
        }
    }
}
