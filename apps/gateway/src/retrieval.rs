//! Retrieval collaborator client.
//!
//! The embedding/vector-search subsystem is an external service
//! consumed through the runtime's [`Augmenter`] trait: the query goes
//! out, the augmented prompt comes back.

use anyhow::Result;
use runtime::Augmenter;
use serde::Deserialize;
use serde_json::json;

/// Prompt augmenter backed by an optional retrieval service.
#[derive(Clone)]
pub enum Retriever {
    /// Augment through a remote retrieval service.
    Http(HttpRetrieval),
    /// No retrieval configured; queries pass through unchanged.
    Off,
}

impl Retriever {
    /// Build from the configured endpoint (empty disables).
    pub fn from_url(client: reqwest::Client, url: &str) -> Self {
        if url.is_empty() {
            Self::Off
        } else {
            Self::Http(HttpRetrieval {
                client,
                url: url.to_owned(),
            })
        }
    }
}

/// HTTP client for the retrieval service.
#[derive(Clone)]
pub struct HttpRetrieval {
    client: reqwest::Client,
    url: String,
}

/// Raw augmentation response.
#[derive(Debug, Deserialize)]
struct RawAugmented {
    prompt: String,
}

impl Augmenter for Retriever {
    async fn augment(&self, query: &str) -> Result<String> {
        let retrieval = match self {
            Self::Off => {
                tracing::debug!("useRAG requested but retrieval is not configured");
                return Ok(query.to_owned());
            }
            Self::Http(retrieval) => retrieval,
        };

        let raw: RawAugmented = retrieval
            .client
            .post(&retrieval.url)
            .json(&json!({"query": query}))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(raw.prompt)
    }
}
