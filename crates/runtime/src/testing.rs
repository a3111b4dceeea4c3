//! Test doubles for the engine and selector.
//!
//! Only compiled with the `testing` feature; production builds never
//! see this module.

use anyhow::Result;
use futures_core::Stream;
use ocore::{
    Completion, Delta, FinishReason, Model, Request, Response, Role, StreamEvent, ToolCall, Usage,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A model that replays scripted completions and event streams, and
/// counts how often it was called.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    inner: Arc<Mutex<Script>>,
}

#[derive(Default)]
struct Script {
    sends: VecDeque<Completion>,
    streams: VecDeque<Vec<StreamEvent>>,
    calls: usize,
}

impl ScriptedModel {
    /// Create an empty script. Unscripted calls answer with "ok".
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned completion for the next `send`.
    pub fn push_completion(&self, completion: Completion) {
        self.inner.lock().sends.push_back(completion);
    }

    /// Queue a plain text response for the next `send`.
    pub fn push_text(&self, content: &str) {
        self.push_completion(Completion::Message(text_response(content)));
    }

    /// Queue a tool-calling response for the next `send`.
    pub fn push_tool_calls(&self, calls: Vec<ToolCall>) {
        self.push_completion(Completion::Message(Response::assistant(
            "scripted-model",
            Delta {
                role: Some(Role::Assistant),
                content: Some(String::new()),
                tool_calls: Some(calls),
                ..Default::default()
            },
            FinishReason::ToolCalls,
            None,
        )));
    }

    /// Queue an event script for the next `stream`.
    pub fn push_stream(&self, events: Vec<StreamEvent>) {
        self.inner.lock().streams.push_back(events);
    }

    /// How many times `send`/`stream` were invoked.
    pub fn calls(&self) -> usize {
        self.inner.lock().calls
    }
}

impl Model for ScriptedModel {
    async fn send(&self, _request: &Request) -> Result<Completion> {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        Ok(inner
            .sends
            .pop_front()
            .unwrap_or_else(|| Completion::Message(text_response("ok"))))
    }

    fn stream(&self, _request: Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        let events = {
            let mut inner = self.inner.lock();
            inner.calls += 1;
            inner.streams.pop_front().unwrap_or_else(|| {
                vec![
                    StreamEvent::ContentBlockDelta {
                        content: "ok".into(),
                    },
                    StreamEvent::Done,
                ]
            })
        };
        async_stream::try_stream! {
            for event in events {
                yield event;
            }
        }
    }
}

/// A plain assistant response with the given content.
pub fn text_response(content: &str) -> Response {
    Response::assistant(
        "scripted-model",
        Delta {
            role: Some(Role::Assistant),
            content: Some(content.to_owned()),
            ..Default::default()
        },
        FinishReason::Stop,
        Some(Usage::new(10, 5)),
    )
}
