//! Replicate predictions API adapter.
//!
//! Work on this vendor is genuinely asynchronous: dispatch submits a
//! prediction job and returns a [`JobTicket`]; the final payload
//! arrives later on the gateway's webhook endpoint and is merged into
//! the transcript by the reconciler.

use crate::http::HttpProvider;
use crate::metrics::record_dispatch;
use anyhow::Result;
use compact_str::CompactString;
use futures_core::Stream;
use ocore::{Completion, Error, JobTicket, Message, Model, Role, StreamEvent};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Instant;

const REPLICATE_API: &str = "https://api.replicate.com/v1";

/// Replicate async-job provider.
#[derive(Clone, Debug)]
pub struct Replicate {
    transport: HttpProvider,
    base: String,
    webhook_url: String,
}

impl Replicate {
    /// Create an adapter for the Replicate API.
    ///
    /// `webhook_url` is the callback template; the literal
    /// `{conversation}` placeholder is filled per dispatch.
    pub fn api(client: Client, key: &str, webhook_url: &str) -> Result<Self> {
        Self::with_base(client, key, webhook_url, REPLICATE_API)
    }

    /// Create an adapter with a custom base URL.
    pub fn custom(client: Client, key: &str, webhook_url: &str, base: &str) -> Result<Self> {
        Self::with_base(client, key, webhook_url, base)
    }

    fn with_base(client: Client, key: &str, webhook_url: &str, base: &str) -> Result<Self> {
        if key.is_empty() {
            return Err(
                Error::Configuration("replicate provider requires an api key".into()).into(),
            );
        }
        if webhook_url.is_empty() {
            return Err(
                Error::Configuration("replicate provider requires a webhook_url".into()).into(),
            );
        }
        Ok(Self {
            transport: HttpProvider::bearer(client, key, base)?,
            base: base.trim_end_matches('/').to_owned(),
            webhook_url: webhook_url.to_owned(),
        })
    }
}

/// The request body for a model-scoped prediction.
#[derive(Debug, Serialize)]
struct Prediction {
    input: Value,
    webhook: String,
    webhook_events_filter: Vec<&'static str>,
}

/// Raw submission response.
#[derive(Debug, Deserialize)]
struct RawSubmission {
    id: CompactString,
    #[serde(default)]
    status: CompactString,
}

impl Model for Replicate {
    async fn send(&self, request: &ocore::Request) -> Result<Completion> {
        if request.conversation.is_empty() {
            return Err(Error::Params(
                "async provider requires a conversation id for webhook routing".into(),
            )
            .into());
        }

        let url = format!("{}/models/{}/predictions", self.base, request.model);
        let webhook = self
            .webhook_url
            .replace("{conversation}", &request.conversation);
        let body = Prediction {
            input: prediction_input(request),
            webhook,
            webhook_events_filter: vec!["completed"],
        };

        let started = Instant::now();
        let text = match self.transport.post_url(&url, &body).await {
            Ok(text) => text,
            Err(e) => {
                record_dispatch("replicate", &request.model, started, None, false);
                return Err(e);
            }
        };
        record_dispatch("replicate", &request.model, started, None, true);

        let raw: RawSubmission = serde_json::from_str(&text)
            .map_err(|e| Error::provider(None, format!("malformed submission: {e}")))?;
        Ok(Completion::Submitted(JobTicket {
            id: raw.id,
            provider: "replicate".into(),
            status: raw.status,
        }))
    }

    #[allow(unreachable_code)]
    fn stream(&self, _request: ocore::Request) -> impl Stream<Item = Result<StreamEvent>> + Send {
        async_stream::try_stream! {
            Err(Error::Params("replicate provider does not stream".into()))?;
            yield StreamEvent::Done;
        }
    }

    fn streams(&self) -> bool {
        false
    }
}

/// Flatten the conversation into the prompt-oriented input this vendor
/// expects.
fn prediction_input(request: &ocore::Request) -> Value {
    let prompt = request
        .messages
        .iter()
        .map(|msg| format!("{}: {}", role_label(msg), msg.content.flatten()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut input = json!({"prompt": prompt});
    if let Some(system) = &request.system_prompt {
        input["system_prompt"] = json!(system);
    }
    if let Some(t) = request.temperature {
        input["temperature"] = json!(t);
    }
    if let Some(p) = request.top_p {
        input["top_p"] = json!(p);
    }
    if let Some(m) = request.max_tokens {
        input["max_tokens"] = json!(m);
    }
    input
}

fn role_label(msg: &Message) -> &'static str {
    match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_input_flattens_conversation() {
        let request = ocore::Request::new("meta/meta-llama-3-70b-instruct")
            .with_messages(vec![
                Message::user("write a poem"),
                Message::assistant("about what?"),
                Message::user("the sea"),
            ])
            .with_system_prompt("be brief");

        let input = prediction_input(&request);
        let prompt = input["prompt"].as_str().unwrap();
        assert!(prompt.contains("user: write a poem"));
        assert!(prompt.contains("assistant: about what?"));
        assert_eq!(input["system_prompt"], "be brief");
    }

    #[test]
    fn streams_is_false() {
        // Construction requires a key; check the flag through the trait
        // on a built instance.
        let provider = Replicate::api(
            Client::new(),
            "r8_test",
            "https://gw.example/hooks/{conversation}?token=t",
        )
        .unwrap();
        assert!(!provider.streams());
    }
}
