//! Shared application state for the gateway server.

use crate::policy::PolicyGuard;
use crate::retrieval::Retriever;
use provider::Provider;
use runtime::Engine;
use std::sync::Arc;

/// The concrete engine type served by this gateway.
pub type GatewayEngine = Engine<Provider, PolicyGuard, Retriever>;

/// Shared state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The orchestration engine (immutable after init).
    pub engine: Arc<GatewayEngine>,
    /// Shared secret for webhook callbacks.
    pub webhook_secret: Arc<str>,
}
