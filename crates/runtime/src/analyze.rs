//! Prompt requirement analysis.
//!
//! Derives a requirements vector from the prompt via an auxiliary call
//! to a fixed lightweight model. Analysis failures never surface to the
//! caller: the selector logs them and falls back to the default model.

use anyhow::{Result, bail};
use compact_str::CompactString;
use ocore::{Completion, Message, Model, Request};
use serde::Deserialize;

/// What a prompt needs from a model. Derived, ephemeral, never persisted.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    /// Expected task complexity, 1..=5.
    pub expected_complexity: u8,
    /// Capabilities the model must cover.
    pub required_capabilities: Vec<CompactString>,
    /// Estimated prompt tokens.
    pub estimated_input_tokens: usize,
    /// Estimated completion tokens.
    pub estimated_output_tokens: usize,
    /// Whether the turn declares tools.
    pub needs_functions: bool,
    /// Whether the turn carries images.
    pub has_images: bool,
    /// Caller budget in dollars, when given.
    pub budget_constraint: Option<f64>,
}

const ANALYSIS_PROMPT: &str = "\
You classify chat prompts. Reply with a single JSON object and nothing else:
{\"expected_complexity\": 1-5, \"required_capabilities\": [subset of \
\"general\",\"code\",\"reasoning\",\"math\",\"creative-writing\",\"summarization\",\"vision\"], \
\"estimated_input_tokens\": n, \"estimated_output_tokens\": n}";

/// Raw shape returned by the analysis model.
#[derive(Debug, Deserialize)]
struct RawRequirements {
    #[serde(default)]
    expected_complexity: u8,
    #[serde(default)]
    required_capabilities: Vec<CompactString>,
    #[serde(default)]
    estimated_input_tokens: usize,
    #[serde(default)]
    estimated_output_tokens: usize,
}

/// Derives [`Requirements`] from prompts using an auxiliary model.
#[derive(Clone)]
pub struct Analyzer<M> {
    model: M,
    analysis_model: CompactString,
}

impl<M: Model + Send + Sync> Analyzer<M> {
    /// Create an analyzer that classifies via the given model id.
    pub fn new(model: M, analysis_model: impl Into<CompactString>) -> Self {
        Self {
            model,
            analysis_model: analysis_model.into(),
        }
    }

    /// Analyze a prompt, filling in the flags the caller already knows.
    pub async fn analyze(
        &self,
        prompt: &str,
        has_images: bool,
        needs_functions: bool,
    ) -> Result<Requirements> {
        let mut requirements = self.classify(prompt).await?;
        requirements.has_images = has_images;
        requirements.needs_functions = needs_functions;
        // The classifier never sees token estimates it can trust below
        // the prompt's own length.
        requirements.estimated_input_tokens = requirements
            .estimated_input_tokens
            .max((prompt.len() / 4).max(1));
        Ok(requirements)
    }

    /// One classification call against the analysis model.
    async fn classify(&self, prompt: &str) -> Result<Requirements> {
        let request = Request::new(self.analysis_model.clone()).with_messages(vec![
            Message::system(ANALYSIS_PROMPT),
            Message::user(prompt),
        ]);

        let Completion::Message(response) = self.model.send(&request).await? else {
            bail!("analysis model returned an async job");
        };
        let Some(content) = response.content() else {
            bail!("analysis model returned no content");
        };

        let raw: RawRequirements = serde_json::from_str(strip_fences(content))?;
        Ok(Requirements {
            expected_complexity: raw.expected_complexity.clamp(1, 5),
            required_capabilities: raw.required_capabilities,
            estimated_input_tokens: raw.estimated_input_tokens,
            estimated_output_tokens: raw.estimated_output_tokens.max(1),
            needs_functions: false,
            has_images: false,
            budget_constraint: None,
        })
    }
}

/// Strip a markdown code fence the analysis model may wrap around JSON.
fn strip_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
