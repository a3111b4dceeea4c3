//! Guardrail gate.
//!
//! The content-policy engine is an external collaborator consumed
//! through the [`Guardrail`] trait. A rejection is not an error: the
//! engine turns it into a normal response with
//! `finish_reason: content_filter`.

use anyhow::Result;
use serde_json::Value;

/// Which side of the model call is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Caller input, checked before any provider dispatch.
    Input,
    /// Model output, checked before returning and persisting.
    Output,
}

/// The outcome of one validation call.
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Whether the text passed.
    pub is_valid: bool,
    /// Policy violations, when rejected.
    pub violations: Vec<String>,
    /// Raw collaborator response, for audit logs.
    pub raw_response: Option<Value>,
}

impl Verdict {
    /// A passing verdict.
    pub fn pass() -> Self {
        Self {
            is_valid: true,
            violations: Vec::new(),
            raw_response: None,
        }
    }

    /// A rejecting verdict with the given violations.
    pub fn reject(violations: Vec<String>) -> Self {
        Self {
            is_valid: false,
            violations,
            raw_response: None,
        }
    }

    /// Human-readable notice for rejected turns.
    pub fn notice(&self) -> String {
        if self.violations.is_empty() {
            "The request was rejected by content policy.".to_owned()
        } else {
            format!(
                "The request was rejected by content policy: {}",
                self.violations.join(", ")
            )
        }
    }
}

/// Trait for the external content-policy engine.
pub trait Guardrail: Send + Sync {
    /// Validate text flowing in the given direction.
    fn validate(
        &self,
        text: &str,
        direction: Direction,
    ) -> impl Future<Output = Result<Verdict>> + Send;
}

/// Pass-through guardrail for deployments without a policy engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unguarded;

impl Guardrail for Unguarded {
    async fn validate(&self, _text: &str, _direction: Direction) -> Result<Verdict> {
        Ok(Verdict::pass())
    }
}
