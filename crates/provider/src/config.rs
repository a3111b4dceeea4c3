//! Provider configuration.

use anyhow::Result;
use ocore::Error;
use serde::{Deserialize, Serialize};

/// Configuration for a single upstream provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which vendor this entry configures.
    #[serde(default)]
    pub kind: ProviderKind,

    /// API key. Optional only for vendors that run unauthenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Optional base URL override for the vendor endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Webhook URL template for async-job vendors. The literal
    /// `{conversation}` placeholder is replaced per dispatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl ProviderConfig {
    /// Validate the entry: vendors that authenticate need a non-empty key.
    pub fn validate(&self) -> Result<()> {
        let needs_key = !matches!(self.kind, ProviderKind::Ollama);
        if needs_key && self.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Configuration(format!(
                "provider '{}' requires an api_key",
                self.kind.name()
            ))
            .into());
        }
        if matches!(self.kind, ProviderKind::Replicate)
            && self.webhook_url.as_deref().unwrap_or("").is_empty()
        {
            return Err(Error::Configuration(
                "provider 'replicate' requires a webhook_url".into(),
            )
            .into());
        }
        Ok(())
    }
}

/// Supported vendor kinds.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI API (default).
    #[default]
    OpenAi,
    /// Grok (xAI) API — OpenAI-compatible.
    Grok,
    /// Qwen (Alibaba DashScope) API — OpenAI-compatible.
    Qwen,
    /// DeepSeek API — OpenAI-compatible.
    DeepSeek,
    /// Claude (Anthropic) Messages API.
    Claude,
    /// Gemini (Google) generateContent API.
    Gemini,
    /// Ollama local API — no key required.
    Ollama,
    /// Replicate predictions API — async jobs with webhook delivery.
    Replicate,
}

impl ProviderKind {
    /// The canonical registry name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Grok => "grok",
            Self::Qwen => "qwen",
            Self::DeepSeek => "deepseek",
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::Replicate => "replicate",
        }
    }
}
