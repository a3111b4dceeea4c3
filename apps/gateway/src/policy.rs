//! Guardrail collaborator client.
//!
//! The content-policy engine is an external service; this is the glue
//! that satisfies the runtime's [`Guardrail`] trait over HTTP. When no
//! endpoint is configured, validation passes everything through.

use anyhow::Result;
use runtime::{Direction, Guardrail, Verdict};
use serde::Deserialize;
use serde_json::json;

/// Guardrail gate backed by an optional HTTP policy engine.
#[derive(Clone)]
pub enum PolicyGuard {
    /// Validate against a remote policy engine.
    Http(HttpPolicy),
    /// No policy engine configured; everything passes.
    Off,
}

impl PolicyGuard {
    /// Build from the configured endpoint (empty disables).
    pub fn from_url(client: reqwest::Client, url: &str) -> Self {
        if url.is_empty() {
            Self::Off
        } else {
            Self::Http(HttpPolicy {
                client,
                url: url.to_owned(),
            })
        }
    }
}

/// HTTP client for the policy engine.
#[derive(Clone)]
pub struct HttpPolicy {
    client: reqwest::Client,
    url: String,
}

/// Raw verdict returned by the policy engine.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    #[serde(rename = "isValid")]
    is_valid: bool,
    #[serde(default)]
    violations: Vec<String>,
}

impl Guardrail for PolicyGuard {
    async fn validate(&self, text: &str, direction: Direction) -> Result<Verdict> {
        let policy = match self {
            Self::Off => return Ok(Verdict::pass()),
            Self::Http(policy) => policy,
        };

        let direction = match direction {
            Direction::Input => "input",
            Direction::Output => "output",
        };
        let raw: serde_json::Value = policy
            .client
            .post(&policy.url)
            .json(&json!({"text": text, "direction": direction}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let verdict: RawVerdict = serde_json::from_value(raw.clone())?;
        Ok(Verdict {
            is_valid: verdict.is_valid,
            violations: verdict.violations,
            raw_response: Some(raw),
        })
    }
}
