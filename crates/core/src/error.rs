//! Error taxonomy for the completion gateway.
//!
//! Typed variants cover the failure classes that cross component
//! boundaries. Glue code propagates them through `anyhow` and the HTTP
//! layer downcasts back to map status codes.

use thiserror::Error as ThisError;

/// Gateway error taxonomy.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Missing or invalid credentials/bindings. Fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input.
    #[error("invalid request: {0}")]
    Params(String),

    /// Upstream vendor failure, with the HTTP status when available.
    #[error("provider error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Provider {
        /// HTTP status from the upstream response, if the call got that far.
        status: Option<u16>,
        /// Human-readable description (vendor body snippet or transport error).
        message: String,
    },

    /// Upstream returned 429.
    #[error("rate limited by upstream")]
    RateLimit,

    /// A lookup target does not exist (e.g. a webhook with no pending entry).
    #[error("not found: {0}")]
    NotFound(String),

    /// A single tool invocation failed. Recorded into the transcript,
    /// never propagated past the orchestrator.
    #[error("tool execution failed: {0}")]
    ToolExecution(String),
}

impl Error {
    /// Construct a provider error from an upstream status and body snippet.
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// Map an upstream HTTP status to the right variant (429 becomes
    /// [`Error::RateLimit`], everything else [`Error::Provider`]).
    pub fn from_status(status: u16, body: &str) -> Self {
        if status == 429 {
            Self::RateLimit
        } else {
            Self::provider(Some(status), truncate(body, 512))
        }
    }
}

/// Truncate a vendor error body to a loggable snippet.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_owned()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_maps_to_rate_limit() {
        assert!(matches!(Error::from_status(429, "slow down"), Error::RateLimit));
    }

    #[test]
    fn other_statuses_map_to_provider() {
        match Error::from_status(503, "overloaded") {
            Error::Provider { status, message } => {
                assert_eq!(status, Some(503));
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn provider_display_includes_status() {
        let err = Error::provider(Some(502), "bad gateway");
        assert_eq!(err.to_string(), "provider error (502): bad gateway");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2048);
        match Error::from_status(500, &body) {
            Error::Provider { message, .. } => assert!(message.len() < 600),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
