//! The per-turn orchestration pipeline.
//!
//! One [`Engine`] serves every conversation. Each inbound request runs
//! on its own task; the only shared mutable state between turns is the
//! [`HistoryStore`], which serializes writers per conversation.

use crate::aggregate::Aggregator;
use crate::analyze::Analyzer;
use crate::augment::{Augmenter, RagOptions};
use crate::guardrail::{Direction, Guardrail, Verdict};
use crate::history::HistoryStore;
use crate::orchestrate::Orchestrator;
use crate::select::Selector;
use anyhow::Result;
use compact_str::CompactString;
use futures_core::Stream;
use futures_util::StreamExt;
use ocore::{
    Catalog, Completion, Content, Error, JobTicket, Message, Model, Registry, Response, Role,
    StreamEvent, Tool, ToolChoice, ToolResult,
};
use schemars::Schema;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// A chat completion request as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// Explicit model pin. When absent the selector picks one.
    #[serde(default)]
    pub model: Option<CompactString>,

    /// The conversation messages.
    pub messages: Vec<IncomingMessage>,

    /// Sampling temperature.
    #[serde(default)]
    pub temperature: Option<f64>,

    /// Nucleus sampling.
    #[serde(default)]
    pub top_p: Option<f64>,

    /// Top-k sampling.
    #[serde(default)]
    pub top_k: Option<u32>,

    /// Maximum tokens to generate.
    #[serde(default)]
    pub max_tokens: Option<usize>,

    /// Frequency penalty.
    #[serde(default)]
    pub frequency_penalty: Option<f64>,

    /// Presence penalty.
    #[serde(default)]
    pub presence_penalty: Option<f64>,

    /// Whether to stream the response.
    #[serde(default)]
    pub stream: bool,

    /// Caller-declared tools (executed client-side).
    #[serde(default)]
    pub tools: Option<Vec<ToolSpec>>,

    /// Conversation id. Generated when absent.
    #[serde(default)]
    pub chat_id: Option<CompactString>,

    /// Whether to augment the prompt with retrieved context.
    #[serde(default, rename = "useRAG")]
    pub use_rag: bool,

    /// Retrieval options.
    #[serde(default, rename = "ragOptions")]
    pub rag_options: Option<RagOptions>,

    /// Selection budget in dollars.
    #[serde(default, rename = "budgetConstraint")]
    pub budget_constraint: Option<f64>,
}

/// One message in a wire request.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    /// The role of the message author.
    pub role: Role,
    /// The content (string or typed parts).
    pub content: Content,
    /// Function name (tool messages).
    #[serde(default)]
    pub name: Option<CompactString>,
    /// The tool call this message responds to.
    #[serde(default)]
    pub tool_call_id: Option<CompactString>,
}

/// A caller-declared tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolSpec {
    /// Tool type, currently always "function".
    #[serde(rename = "type")]
    pub kind: CompactString,
    /// The function declaration.
    pub function: FunctionSpec,
}

/// A caller-declared function.
#[derive(Debug, Clone, Deserialize)]
pub struct FunctionSpec {
    /// The function name.
    pub name: CompactString,
    /// The function description.
    #[serde(default)]
    pub description: String,
    /// The parameter schema.
    pub parameters: Schema,
}

/// A normalized request, ready for dispatch.
struct Normalized {
    conversation: CompactString,
    messages: Vec<Message>,
    tools: Vec<Tool>,
    caller_tools: bool,
    user_text: String,
    has_images: bool,
}

/// The per-turn orchestration engine.
pub struct Engine<M: Model, G: Guardrail, A: Augmenter> {
    registry: Registry<M>,
    catalog: Catalog,
    selector: Selector<M>,
    orchestrator: Orchestrator,
    store: HistoryStore,
    guardrail: G,
    augmenter: Option<A>,
}

impl<M, G> Engine<M, G, crate::augment::NoAugment>
where
    M: Model + Send + Sync,
    G: Guardrail,
{
    /// Create an engine over the given providers and catalog.
    ///
    /// The requirement analyzer runs against the registry's default
    /// provider with the given analysis model id.
    pub fn new(
        registry: Registry<M>,
        catalog: Catalog,
        analysis_model: impl Into<CompactString>,
        guardrail: G,
    ) -> Self {
        let analyzer = Analyzer::new(registry.default_provider().clone(), analysis_model);
        let selector = Selector::new(catalog.clone(), analyzer);
        Self {
            registry,
            catalog,
            selector,
            orchestrator: Orchestrator::new(),
            store: HistoryStore::new(),
            guardrail,
            augmenter: None,
        }
    }
}

impl<M, G, A> Engine<M, G, A>
where
    M: Model + Send + Sync,
    G: Guardrail,
    A: Augmenter,
{
    /// Attach a prompt augmenter.
    pub fn with_augmenter<B: Augmenter>(self, augmenter: B) -> Engine<M, G, B> {
        Engine {
            registry: self.registry,
            catalog: self.catalog,
            selector: self.selector,
            orchestrator: self.orchestrator,
            store: self.store,
            guardrail: self.guardrail,
            augmenter: Some(augmenter),
        }
    }

    /// The tool orchestrator, for registering server-side tools.
    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// The transcript store.
    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// The capability catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one non-streaming turn.
    pub async fn turn(&self, request: ChatRequest, cancel: &CancellationToken) -> Result<Response> {
        let mut norm = self.normalize(&request)?;

        let verdict = self.check(&norm.user_text, Direction::Input).await;
        if !verdict.is_valid {
            return Ok(Response::content_filter(
                self.catalog.default_model().clone(),
                verdict.notice(),
            ));
        }

        self.augment(&request, &mut norm).await;
        let (model, provider_name, supports_functions) = self.resolve_model(&request, &norm).await;
        let provider = self.registry.get(&provider_name);

        self.persist_user_turn(&norm).await;

        let core_request = self.build_request(&request, &model, norm.messages.clone(), &norm, supports_functions);
        let completion = tokio::select! {
            biased;
            _ = cancel.cancelled() => anyhow::bail!("request cancelled"),
            result = provider.send(&core_request) => result?,
        };

        let response = match completion {
            Completion::Submitted(ticket) => {
                return Ok(self.record_submission(&norm.conversation, &model, ticket).await);
            }
            Completion::Message(response) => response,
        };

        let calls = response.tool_calls().unwrap_or_default().to_vec();
        let final_response = if calls.is_empty() {
            response
        } else if norm.caller_tools && !calls.iter().all(|c| self.orchestrator.contains(&c.function.name)) {
            // Caller-declared tools the gateway cannot run: record the
            // request and hand the calls back for client-side execution.
            if let Some(message) = response.message() {
                self.store.add(&norm.conversation, message).await;
            }
            return Ok(response);
        } else {
            let appended = self
                .orchestrator
                .run(&norm.conversation, &calls, &self.store)
                .await?;

            let mut messages = norm.messages.clone();
            messages.extend(appended);
            let follow = self
                .build_request(&request, &model, messages, &norm, supports_functions)
                .with_tool_choice(ToolChoice::None);

            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => anyhow::bail!("request cancelled"),
                result = provider.send(&follow) => result?,
            };
            match completion {
                Completion::Message(response) => response,
                Completion::Submitted(ticket) => {
                    return Ok(self.record_submission(&norm.conversation, &model, ticket).await);
                }
            }
        };

        if let Some(calls) = final_response.tool_calls()
            && !calls.is_empty()
        {
            tracing::warn!("tool calls after the re-entrant round are not executed");
        }

        let content = final_response.content().cloned().unwrap_or_default();
        if !content.is_empty() {
            let verdict = self.check(&content, Direction::Output).await;
            if !verdict.is_valid {
                return Ok(Response::content_filter(model, verdict.notice()));
            }
        }

        if cancel.is_cancelled() {
            anyhow::bail!("request cancelled");
        }
        if let Some(mut message) = final_response.message() {
            message.model = model.clone();
            self.store.add(&norm.conversation, message).await;
        }

        Ok(final_response)
    }

    /// Run one streaming turn, yielding normalized events. The final
    /// `Done` event is emitted exactly once, after persistence.
    pub fn turn_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<StreamEvent>> + 'a {
        async_stream::try_stream! {
            let mut norm = self.normalize(&request)?;

            let verdict = self.check(&norm.user_text, Direction::Input).await;
            if !verdict.is_valid {
                yield StreamEvent::ContentBlockDelta { content: verdict.notice() };
                yield StreamEvent::Done;
                return;
            }

            self.augment(&request, &mut norm).await;
            let (model, provider_name, supports_functions) = self.resolve_model(&request, &norm).await;
            let provider = self.registry.get(&provider_name);

            self.persist_user_turn(&norm).await;

            if !provider.streams() {
                let core_request = self.build_request(&request, &model, norm.messages.clone(), &norm, supports_functions);
                let completion = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(anyhow::anyhow!("request cancelled")),
                    result = provider.send(&core_request) => result.map_err(Into::into),
                };
                let completion = completion?;
                let notice = match completion {
                    Completion::Submitted(ticket) => {
                        let response = self.record_submission(&norm.conversation, &model, ticket).await;
                        response.content().cloned().unwrap_or_default()
                    }
                    Completion::Message(response) => {
                        if let Some(mut message) = response.message() {
                            message.model = model.clone();
                            self.store.add(&norm.conversation, message).await;
                        }
                        response.content().cloned().unwrap_or_default()
                    }
                };
                yield StreamEvent::ContentBlockDelta { content: notice };
                yield StreamEvent::Done;
                return;
            }

            let mut messages = norm.messages.clone();
            let mut tool_choice = None;
            let mut final_message = None;

            for round in 0..2 {
                let mut core_request = self.build_request(&request, &model, messages.clone(), &norm, supports_functions);
                if let Some(choice) = tool_choice.clone() {
                    core_request = core_request.with_tool_choice(choice);
                }

                let inner = provider.stream(core_request);
                futures_util::pin_mut!(inner);
                let mut aggregator = Aggregator::new();

                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Some(Err(anyhow::anyhow!("request cancelled"))),
                        next = inner.next() => next,
                    };
                    let Some(next) = next else { break };
                    let event = next?;
                    let done = matches!(event, StreamEvent::Done);
                    aggregator.apply(event.clone());
                    if done {
                        break;
                    }
                    yield event;
                }

                let turn = aggregator.finish()?;
                let calls = turn.message.tool_calls.clone();

                if calls.is_empty() || round == 1 {
                    if round == 1 && !calls.is_empty() {
                        tracing::warn!("tool calls after the re-entrant round are not executed");
                    }
                    final_message = Some(turn.message);
                    break;
                }

                if norm.caller_tools
                    && !calls.iter().all(|c| self.orchestrator.contains(&c.function.name))
                {
                    // Client-side tools: record the request and stop;
                    // the caller executes and comes back.
                    final_message = Some(turn.message);
                    break;
                }

                let appended = self
                    .orchestrator
                    .run(&norm.conversation, &calls, &self.store)
                    .await?;
                for message in appended.iter().filter(|m| m.role == Role::Tool) {
                    yield StreamEvent::ToolResponse {
                        result: ToolResult {
                            id: message.tool_call_id.clone(),
                            content: message.content.flatten(),
                            status: message.status.clone(),
                            data: message.data.clone(),
                        },
                    };
                }
                messages.extend(appended);
                tool_choice = Some(ToolChoice::None);
            }

            let Some(mut message) = final_message else {
                Err(Error::provider(None, "stream produced no final message"))?;
                return;
            };

            let content = message.content.flatten();
            if !content.is_empty() {
                let verdict = self.check(&content, Direction::Output).await;
                if !verdict.is_valid {
                    yield StreamEvent::ContentBlockDelta { content: verdict.notice() };
                    yield StreamEvent::Done;
                    return;
                }
            }

            if cancel.is_cancelled() {
                Err(anyhow::anyhow!("request cancelled"))?;
            }
            message.model = model.clone();
            self.store.add(&norm.conversation, message).await;
            yield StreamEvent::Done;
        }
    }

    /// Validate the wire request and build the normalized form.
    fn normalize(&self, request: &ChatRequest) -> Result<Normalized> {
        if request.messages.is_empty() {
            return Err(Error::Params("messages must not be empty".into()).into());
        }

        let mut messages = Vec::with_capacity(request.messages.len());
        for incoming in &request.messages {
            if incoming.role == Role::Tool && incoming.name.as_deref().unwrap_or("").is_empty() {
                return Err(Error::Params("tool messages require a name".into()).into());
            }
            messages.push(Message {
                role: incoming.role,
                content: incoming.content.clone(),
                name: incoming.name.clone().unwrap_or_default(),
                tool_call_id: incoming.tool_call_id.clone().unwrap_or_default(),
                ..Default::default()
            });
        }

        let user_text = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.flatten())
            .ok_or_else(|| Error::Params("at least one user message is required".into()))?;
        let has_images = messages.iter().any(|m| m.content.has_images());

        // Caller-declared tools plus everything registered server-side.
        let mut tools: Vec<Tool> = request
            .tools
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|spec| Tool {
                name: spec.function.name.clone(),
                description: spec.function.description.clone(),
                parameters: spec.function.parameters.clone(),
                strict: false,
            })
            .collect();
        let caller_tools = !tools.is_empty();
        for tool in self.orchestrator.schemas() {
            if !tools.iter().any(|t| t.name == tool.name) {
                tools.push(tool);
            }
        }

        let conversation = request
            .chat_id
            .clone()
            .unwrap_or_else(|| CompactString::from(ulid::Ulid::new().to_string()));

        Ok(Normalized {
            conversation,
            messages,
            tools,
            caller_tools,
            user_text,
            has_images,
        })
    }

    /// Replace the newest user message with its augmented form.
    async fn augment(&self, request: &ChatRequest, norm: &mut Normalized) {
        if !request.use_rag {
            return;
        }
        let Some(augmenter) = &self.augmenter else {
            tracing::warn!("useRAG requested but no augmenter is configured");
            return;
        };
        match augmenter.augment(&norm.user_text).await {
            Ok(augmented) => {
                if let Some(message) = norm.messages.iter_mut().rev().find(|m| m.role == Role::User)
                {
                    message.content = Content::Text(augmented.clone());
                }
                norm.user_text = augmented;
            }
            // Retrieval failures degrade to the raw prompt.
            Err(e) => tracing::warn!("prompt augmentation failed: {e}"),
        }
    }

    /// Resolve the model id, its provider, and whether tools may be
    /// attached upstream.
    async fn resolve_model(
        &self,
        request: &ChatRequest,
        norm: &Normalized,
    ) -> (CompactString, CompactString, bool) {
        let model = match &request.model {
            Some(model) if !model.is_empty() => model.clone(),
            _ => {
                self.selector
                    .select(
                        &norm.user_text,
                        norm.has_images,
                        !norm.tools.is_empty(),
                        request.budget_constraint,
                    )
                    .await
            }
        };

        match self.catalog.get(&model) {
            Some(row) => (model.clone(), row.provider.clone(), row.supports_functions),
            None => {
                // Pinned model outside the catalog: route to the default
                // provider and trust the caller on function support.
                (
                    model.clone(),
                    CompactString::from(self.registry.default_name()),
                    true,
                )
            }
        }
    }

    /// Append the newest user message to the transcript.
    async fn persist_user_turn(&self, norm: &Normalized) {
        if let Some(message) = norm.messages.iter().rev().find(|m| m.role == Role::User) {
            self.store.add(&norm.conversation, message.clone()).await;
        }
    }

    /// Build the normalized upstream request.
    fn build_request(
        &self,
        request: &ChatRequest,
        model: &CompactString,
        messages: Vec<Message>,
        norm: &Normalized,
        supports_functions: bool,
    ) -> ocore::Request {
        let mut core = ocore::Request::new(model.clone()).with_messages(messages);
        core.temperature = request.temperature;
        core.top_p = request.top_p;
        core.top_k = request.top_k;
        core.max_tokens = request.max_tokens;
        core.frequency_penalty = request.frequency_penalty;
        core.presence_penalty = request.presence_penalty;
        core.usage = true;
        core.conversation = norm.conversation.clone();
        if supports_functions && !norm.tools.is_empty() {
            core = core
                .with_tools(norm.tools.clone())
                .with_tool_choice(ToolChoice::Auto);
        }
        core
    }

    /// Store the interim record for an accepted async job and build the
    /// caller-visible response.
    async fn record_submission(
        &self,
        conversation: &str,
        model: &CompactString,
        ticket: JobTicket,
    ) -> Response {
        let notice = format!(
            "Job {} submitted to {}; the result will arrive asynchronously.",
            ticket.id, ticket.provider
        );
        let mut message = Message::assistant(notice.clone());
        message.status = "submitted".into();
        message.model = model.clone();
        message.data = Some(json!({
            "id": ticket.id,
            "provider": ticket.provider,
            "status": ticket.status,
        }));
        self.store.add(conversation, message).await;

        Response::assistant(
            model.clone(),
            ocore::Delta {
                role: Some(Role::Assistant),
                content: Some(notice),
                ..Default::default()
            },
            ocore::FinishReason::Stop,
            None,
        )
    }

    /// Gate text through the guardrail, failing open on collaborator
    /// errors.
    async fn check(&self, text: &str, direction: Direction) -> Verdict {
        match self.guardrail.validate(text, direction).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("guardrail validation failed open ({direction:?}): {e}");
                Verdict::pass()
            }
        }
    }
}
