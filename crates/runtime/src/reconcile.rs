//! Async completion reconciliation.
//!
//! Matches an out-of-band webhook payload to the pending transcript
//! entry the dispatch path stored (`data.id == payload.id`) and merges
//! it in place. Webhooks are delivered at-least-once and may arrive
//! before the submitting turn finishes; the store's per-conversation
//! writer lock, not this module, is what prevents corruption.

use crate::history::HistoryStore;
use anyhow::Result;
use compact_str::CompactString;
use ocore::{Error, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A webhook callback payload from an async-job vendor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookPayload {
    /// The vendor job id.
    pub id: CompactString,

    /// Final job status ("succeeded", "failed", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CompactString>,

    /// Job output, shape is vendor-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    /// Error payload, when the job failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,

    /// Vendor execution logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

/// Merge a webhook payload into its pending transcript entry.
///
/// Shallow merge, webhook fields win; re-delivering the same payload
/// produces the same merged state. When no entry matches, the
/// conversation is left untouched and [`Error::NotFound`] is returned —
/// a stale or misrouted webhook must never create a message.
pub async fn reconcile(
    store: &HistoryStore,
    conversation: &str,
    payload: &WebhookPayload,
) -> Result<()> {
    let patch = serde_json::to_value(payload)?;

    store
        .update_with(conversation, |messages| {
            let Some(message) = messages
                .iter_mut()
                .find(|message| job_id(message) == Some(payload.id.as_str()))
            else {
                return Err(Error::NotFound(format!(
                    "no pending entry for job '{}'",
                    payload.id
                ))
                .into());
            };

            let data = message
                .data
                .get_or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let (Some(data), Some(patch)) = (data.as_object_mut(), patch.as_object()) {
                for (key, value) in patch {
                    data.insert(key.clone(), value.clone());
                }
            }
            if let Some(status) = &payload.status {
                message.status = status.clone();
            }
            Ok(())
        })
        .await
}

/// The async job id recorded on a message, if any.
fn job_id(message: &Message) -> Option<&str> {
    message.data.as_ref()?.get("id")?.as_str()
}
