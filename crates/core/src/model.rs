//! Unified provider trait.

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::stream::StreamEvent;
use anyhow::Result;
use compact_str::CompactString;
use futures_core::Stream;
use serde::{Deserialize, Serialize};

/// Unified provider trait.
///
/// Abstracts any upstream backend — single-vendor adapters or the
/// [`Registry`](crate::Registry). Constructors are inherent methods on
/// each adapter, never called polymorphically.
pub trait Model: Sized + Clone {
    /// Send a chat completion request.
    fn send(&self, request: &Request) -> impl Future<Output = Result<Completion>> + Send;

    /// Stream a chat completion response as normalized events.
    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamEvent>> + Send;

    /// Whether this backend can stream. Async-job vendors return false;
    /// callers fall back to [`Model::send`].
    fn streams(&self) -> bool {
        true
    }
}

/// The outcome of a non-streaming dispatch.
#[derive(Debug, Clone)]
pub enum Completion {
    /// The vendor answered synchronously.
    Message(Response),

    /// The vendor accepted an asynchronous job; the final payload
    /// arrives later on the webhook path.
    Submitted(JobTicket),
}

/// An accepted asynchronous job.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobTicket {
    /// Vendor job id. The reconciler matches webhook payloads on it.
    pub id: CompactString,

    /// The provider that accepted the job.
    pub provider: CompactString,

    /// Vendor-reported status at submission ("starting", "queued", ...).
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub status: CompactString,
}

/// `()` as a no-op Model for testing (panics on send/stream).
impl Model for () {
    async fn send(&self, _request: &Request) -> Result<Completion> {
        panic!("noop model: send called — not intended for real LLM calls");
    }

    #[allow(unreachable_code)]
    fn stream(&self, _request: Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        panic!("noop model: stream called — not intended for real LLM calls");
        async_stream::stream! {
            yield Err(Error::Configuration("noop model".into()).into());
        }
    }
}
