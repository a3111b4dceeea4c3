//! Orchestration engine for the orca completion gateway.
//!
//! The [`Engine`] drives one chat turn end to end: normalize the caller
//! request, gate it through the guardrail, pick a model, dispatch to the
//! right provider, aggregate the streamed response, run server-side tool
//! calls (one re-entrant round), gate the output, and persist the
//! transcript. The [`reconcile`] path runs independently off inbound
//! webhooks against the same [`HistoryStore`].

pub use aggregate::{Aggregator, Turn};
pub use analyze::{Analyzer, Requirements};
pub use augment::{Augmenter, NoAugment, RagOptions};
pub use engine::{ChatRequest, Engine, FunctionSpec, IncomingMessage, ToolSpec};
pub use guardrail::{Direction, Guardrail, Unguarded, Verdict};
pub use history::HistoryStore;
pub use orchestrate::{Handler, Orchestrator, ToolOutput};
pub use reconcile::{WebhookPayload, reconcile};
pub use select::{Selector, score};

mod aggregate;
mod analyze;
mod augment;
mod engine;
mod guardrail;
mod history;
mod orchestrate;
mod reconcile;
mod select;

#[cfg(feature = "testing")]
pub mod testing;
