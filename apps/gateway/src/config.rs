//! Gateway configuration loaded from TOML.

use anyhow::{Context, Result};
use compact_str::CompactString;
use ocore::{Capability, Catalog};
use provider::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level gateway configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Webhook endpoint configuration.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Model selection configuration.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Guardrail collaborator configuration.
    #[serde(default)]
    pub guardrail: GuardrailConfig,

    /// Retrieval collaborator configuration.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Upstream provider entries. The first entry is the default
    /// provider (it also serves the requirement analyzer).
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    /// Capability catalog override. Empty means the built-in catalog.
    #[serde(default)]
    pub models: Vec<Capability>,
}

/// Server configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_owned(),
        }
    }
}

/// Webhook endpoint configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret; callbacks without it are rejected with 403.
    /// Supports `${ENV_VAR}` expansion.
    pub secret: String,
}

/// Model selection configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Model used by the requirement analyzer.
    pub analysis_model: CompactString,

    /// Default model override. Empty keeps the catalog's default.
    pub default_model: CompactString,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            analysis_model: "gpt-4o-mini".into(),
            default_model: CompactString::default(),
        }
    }
}

/// Guardrail collaborator configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Policy engine endpoint. Empty disables validation.
    pub url: String,
}

/// Retrieval collaborator configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Retrieval service endpoint. Empty disables `useRAG`.
    pub url: String,
}

/// One configured upstream provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Registry name. Defaults to the vendor kind's canonical name.
    #[serde(default)]
    pub name: CompactString,

    /// Vendor configuration.
    #[serde(flatten)]
    pub config: ProviderConfig,
}

impl ProviderEntry {
    /// The registry name for this entry.
    pub fn name(&self) -> CompactString {
        if self.name.is_empty() {
            CompactString::from(self.config.kind.name())
        } else {
            self.name.clone()
        }
    }
}

impl GatewayConfig {
    /// Parse a TOML string, expanding `${ENV_VAR}` patterns first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = crate::utils::expand_env_vars(toml_str);
        let config: Self = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load configuration from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Resolve the capability catalog: config rows when given, the
    /// built-in table otherwise, with the default-model override
    /// applied.
    pub fn catalog(&self) -> Result<Catalog> {
        if self.models.is_empty() {
            let catalog = Catalog::builtin();
            if self.selection.default_model.is_empty() {
                return Ok(catalog);
            }
            let rows = catalog.iter().cloned().collect();
            return Catalog::new(rows, self.selection.default_model.clone());
        }

        let default_model = if self.selection.default_model.is_empty() {
            self.models[0].id.clone()
        } else {
            self.selection.default_model.clone()
        };
        Catalog::new(self.models.clone(), default_model)
    }
}
