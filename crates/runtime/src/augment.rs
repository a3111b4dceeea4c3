//! Prompt augmentation.
//!
//! The embedding/vector-search subsystem is an external collaborator
//! consumed through the [`Augmenter`] trait: it takes the user query
//! and returns the augmented prompt.

use anyhow::Result;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Trait for the external retrieval subsystem.
pub trait Augmenter: Send + Sync {
    /// Augment the user query with retrieved context.
    fn augment(&self, query: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Identity augmenter for deployments without retrieval.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAugment;

impl Augmenter for NoAugment {
    async fn augment(&self, query: &str) -> Result<String> {
        Ok(query.to_owned())
    }
}

/// Retrieval options accepted on the wire and handed to the
/// collaborator's configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RagOptions {
    /// Number of chunks to retrieve.
    #[serde(default, rename = "topK", skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    /// Minimum similarity score.
    #[serde(default, rename = "scoreThreshold", skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f64>,

    /// Vector namespace to search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<CompactString>,
}
