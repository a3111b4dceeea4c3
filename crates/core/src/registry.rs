//! Named provider registry.
//!
//! An immutable `name → adapter` map constructed once at process start
//! and passed by reference. Unknown names fall back to the default
//! adapter rather than failing the request.

use crate::model::{Completion, Model};
use crate::request::Request;
use crate::stream::StreamEvent;
use anyhow::Result;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use std::collections::BTreeMap;

/// An immutable map of named providers with a default fallback.
#[derive(Clone)]
pub struct Registry<M> {
    providers: BTreeMap<CompactString, M>,
    default_name: CompactString,
}

impl<M: Model> Registry<M> {
    /// Create a registry with the given default provider.
    pub fn new(default_name: impl Into<CompactString>, default: M) -> Self {
        let default_name = default_name.into();
        let mut providers = BTreeMap::new();
        providers.insert(default_name.clone(), default);
        Self {
            providers,
            default_name,
        }
    }

    /// Add a named provider. Replaces any existing entry with that name.
    pub fn with(mut self, name: impl Into<CompactString>, provider: M) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    /// Resolve a provider by name, falling back to the default on
    /// unknown names (with a warning).
    pub fn get(&self, name: &str) -> &M {
        match self.providers.get(name) {
            Some(provider) => provider,
            None => {
                tracing::warn!("unknown provider '{name}', using default '{}'", self.default_name);
                self.default_provider()
            }
        }
    }

    /// The default provider.
    pub fn default_provider(&self) -> &M {
        &self.providers[&self.default_name]
    }

    /// The default provider's name.
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// Whether a provider with this exact name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Registered provider names, in order.
    pub fn names(&self) -> impl Iterator<Item = &CompactString> {
        self.providers.keys()
    }
}

impl<M: Model + Send + Sync> Model for Registry<M> {
    async fn send(&self, request: &Request) -> Result<Completion> {
        self.default_provider().send(request).await
    }

    fn stream(&self, request: Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        let provider = self.default_provider().clone();
        async_stream::try_stream! {
            let mut stream = std::pin::pin!(provider.stream(request));
            while let Some(event) = stream.next().await {
                yield event?;
            }
        }
    }

    fn streams(&self) -> bool {
        self.default_provider().streams()
    }
}
