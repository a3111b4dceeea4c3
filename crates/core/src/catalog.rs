//! Model capability catalog.
//!
//! A static table describing what each known model is good at, what it
//! costs, and which provider serves it. The selector scores candidates
//! against this table; iteration order is the authoring order, which
//! makes tie-breaking deterministic.

use anyhow::{Result, bail};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// An immutable capability row for one model.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Capability {
    /// Model identifier.
    pub id: CompactString,

    /// Provider name in the registry serving this model.
    pub provider: CompactString,

    /// What the model is good at ("code", "reasoning", "vision", ...).
    #[serde(default)]
    pub strengths: Vec<CompactString>,

    /// How complex a context the model handles well (1..=5).
    pub context_complexity: u8,

    /// Cost per 1k input tokens, in dollars.
    pub cost_per_1k_input: f64,

    /// Cost per 1k output tokens, in dollars.
    pub cost_per_1k_output: f64,

    /// Relative latency class, 1 (fastest) ..= 5 (slowest).
    pub speed: u8,

    /// Observed reliability, 0..=1.
    pub reliability: f64,

    /// Whether the model accepts image input.
    #[serde(default)]
    pub multimodal: bool,

    /// Whether the model supports function/tool calling.
    #[serde(default)]
    pub supports_functions: bool,
}

/// The capability catalog: an ordered, immutable set of rows plus the
/// default model used when selection cannot produce a winner.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Catalog {
    rows: Vec<Capability>,
    default_model: CompactString,
}

impl Catalog {
    /// Build a catalog from rows and a default model id.
    ///
    /// The default must be one of the rows.
    pub fn new(rows: Vec<Capability>, default_model: impl Into<CompactString>) -> Result<Self> {
        let default_model = default_model.into();
        if !rows.iter().any(|row| row.id == default_model) {
            bail!("default model '{default_model}' not present in catalog");
        }
        Ok(Self {
            rows,
            default_model,
        })
    }

    /// The built-in catalog shipped with the gateway.
    pub fn builtin() -> Self {
        let rows = vec![
            Capability {
                id: "gpt-4o".into(),
                provider: "openai".into(),
                strengths: strengths(&["general", "code", "reasoning", "vision"]),
                context_complexity: 5,
                cost_per_1k_input: 0.0025,
                cost_per_1k_output: 0.01,
                speed: 3,
                reliability: 0.98,
                multimodal: true,
                supports_functions: true,
            },
            Capability {
                id: "gpt-4o-mini".into(),
                provider: "openai".into(),
                strengths: strengths(&["general", "summarization"]),
                context_complexity: 3,
                cost_per_1k_input: 0.00015,
                cost_per_1k_output: 0.0006,
                speed: 1,
                reliability: 0.97,
                multimodal: true,
                supports_functions: true,
            },
            Capability {
                id: "claude-sonnet-4-20250514".into(),
                provider: "claude".into(),
                strengths: strengths(&["general", "code", "reasoning", "creative-writing", "vision"]),
                context_complexity: 5,
                cost_per_1k_input: 0.003,
                cost_per_1k_output: 0.015,
                speed: 3,
                reliability: 0.98,
                multimodal: true,
                supports_functions: true,
            },
            Capability {
                id: "claude-3-5-haiku-20241022".into(),
                provider: "claude".into(),
                strengths: strengths(&["general", "summarization"]),
                context_complexity: 2,
                cost_per_1k_input: 0.0008,
                cost_per_1k_output: 0.004,
                speed: 1,
                reliability: 0.97,
                multimodal: false,
                supports_functions: true,
            },
            Capability {
                id: "gemini-2.0-flash".into(),
                provider: "gemini".into(),
                strengths: strengths(&["general", "summarization", "vision"]),
                context_complexity: 4,
                cost_per_1k_input: 0.0001,
                cost_per_1k_output: 0.0004,
                speed: 1,
                reliability: 0.95,
                multimodal: true,
                supports_functions: true,
            },
            Capability {
                id: "deepseek-chat".into(),
                provider: "deepseek".into(),
                strengths: strengths(&["general", "code", "math"]),
                context_complexity: 4,
                cost_per_1k_input: 0.00027,
                cost_per_1k_output: 0.0011,
                speed: 2,
                reliability: 0.94,
                multimodal: false,
                supports_functions: true,
            },
            Capability {
                id: "llama3.3".into(),
                provider: "ollama".into(),
                strengths: strengths(&["general"]),
                context_complexity: 3,
                cost_per_1k_input: 0.0,
                cost_per_1k_output: 0.0,
                speed: 4,
                reliability: 0.9,
                multimodal: false,
                supports_functions: false,
            },
            Capability {
                id: "meta/meta-llama-3-70b-instruct".into(),
                provider: "replicate".into(),
                strengths: strengths(&["general", "creative-writing"]),
                context_complexity: 3,
                cost_per_1k_input: 0.00065,
                cost_per_1k_output: 0.00275,
                speed: 5,
                reliability: 0.92,
                multimodal: false,
                supports_functions: false,
            },
        ];
        Self::new(rows, "gpt-4o-mini").expect("builtin catalog is well-formed")
    }

    /// Look up a row by model id.
    pub fn get(&self, id: &str) -> Option<&Capability> {
        self.rows.iter().find(|row| row.id == id)
    }

    /// Iterate rows in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.rows.iter()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The default model id.
    pub fn default_model(&self) -> &CompactString {
        &self.default_model
    }
}

fn strengths(names: &[&str]) -> Vec<CompactString> {
    names.iter().map(|s| CompactString::from(*s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_default_is_present() {
        let catalog = Catalog::builtin();
        assert!(catalog.get(catalog.default_model()).is_some());
    }

    #[test]
    fn new_rejects_missing_default() {
        let rows = vec![Capability {
            id: "a".into(),
            provider: "openai".into(),
            strengths: Vec::new(),
            context_complexity: 3,
            cost_per_1k_input: 0.001,
            cost_per_1k_output: 0.002,
            speed: 2,
            reliability: 0.9,
            multimodal: false,
            supports_functions: false,
        }];
        assert!(Catalog::new(rows, "missing").is_err());
    }

    #[test]
    fn iteration_order_is_stable() {
        let catalog = Catalog::builtin();
        let first: Vec<_> = catalog.iter().map(|r| r.id.clone()).collect();
        let second: Vec<_> = catalog.iter().map(|r| r.id.clone()).collect();
        assert_eq!(first, second);
    }
}
