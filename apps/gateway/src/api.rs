//! HTTP surface — axum router and handlers.
//!
//! `POST /v1/chat/completions` serves both delivery models: a JSON
//! response, or SSE frames of the normalized event grammar terminated
//! by `data: [DONE]`. `POST /hooks/{conversation}` receives async-job
//! callbacks, and `POST /v1/feedback` forwards ratings to the
//! observability sink.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::post,
};
use futures_util::StreamExt;
use ocore::StreamEvent;
use runtime::{ChatRequest, WebhookPayload, reconcile};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

/// Build the axum router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(completions))
        .route("/v1/feedback", post(feedback))
        .route("/hooks/{conversation}", post(webhook))
        .with_state(state)
}

/// Chat completions handler: JSON or SSE depending on `stream`.
async fn completions(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let cancel = CancellationToken::new();

    if request.stream {
        return sse_completions(state, request, cancel);
    }

    match state.engine.turn(request, &cancel).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Streaming branch: normalized events re-framed as SSE.
fn sse_completions(state: AppState, request: ChatRequest, cancel: CancellationToken) -> Response {
    // Dropping the response stream (client gone) cancels the turn.
    let guard = cancel.clone().drop_guard();

    let stream = async_stream::stream! {
        let _guard = guard;
        let inner = state.engine.turn_stream(request, cancel);
        futures_util::pin_mut!(inner);

        while let Some(event) = inner.next().await {
            match event {
                Ok(StreamEvent::Done) => {
                    yield Ok::<_, Infallible>(Event::default().data("[DONE]"));
                    break;
                }
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(data) => yield Ok(Event::default().data(data)),
                    Err(e) => tracing::error!("failed to serialize stream event: {e}"),
                },
                Err(e) => {
                    tracing::warn!("stream turn failed: {e:#}");
                    let data = json!({"type": "error", "message": e.to_string()});
                    yield Ok(Event::default().data(data.to_string()));
                    yield Ok(Event::default().data("[DONE]"));
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// Webhook query parameters.
#[derive(Debug, Deserialize)]
struct WebhookQuery {
    token: String,
}

/// Async-job callback handler.
///
/// The token is checked before any reconciliation. A payload that
/// matches no pending entry is acknowledged anyway — vendors redeliver
/// on non-2xx, and a stale webhook will never start matching.
async fn webhook(
    State(state): State<AppState>,
    Path(conversation): Path<String>,
    Query(query): Query<WebhookQuery>,
    Json(payload): Json<WebhookPayload>,
) -> Response {
    if !token_matches(&query.token, &state.webhook_secret) {
        return StatusCode::FORBIDDEN.into_response();
    }

    match reconcile(state.engine.store(), &conversation, &payload).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) if matches!(e.downcast_ref::<ocore::Error>(), Some(ocore::Error::NotFound(_))) => {
            tracing::warn!("webhook for conversation '{conversation}' matched nothing: {e}");
            StatusCode::OK.into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// A feedback submission.
#[derive(Debug, Deserialize)]
struct Feedback {
    #[serde(rename = "logId")]
    log_id: String,
    /// 1 for thumbs-up, -1 for thumbs-down.
    feedback: i8,
    #[serde(default)]
    score: Option<f64>,
}

/// Feedback handler: forwarded to the observability sink, not part of
/// the core state machine.
async fn feedback(Json(feedback): Json<Feedback>) -> StatusCode {
    let direction = if feedback.feedback >= 0 { "up" } else { "down" };
    metrics::counter!("orca_feedback_total", "direction" => direction).increment(1);
    tracing::info!(
        log_id = %feedback.log_id,
        feedback = feedback.feedback,
        score = feedback.score,
        "feedback received"
    );
    StatusCode::NO_CONTENT
}

/// Constant-time token comparison.
fn token_matches(provided: &str, expected: &str) -> bool {
    if expected.is_empty() || provided.len() != expected.len() {
        return false;
    }
    provided
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_matches_exact() {
        assert!(token_matches("secret-1", "secret-1"));
    }

    #[test]
    fn token_rejects_mismatch_and_prefix() {
        assert!(!token_matches("secret-2", "secret-1"));
        assert!(!token_matches("secret", "secret-1"));
    }

    #[test]
    fn empty_expected_rejects_everything() {
        assert!(!token_matches("", ""));
        assert!(!token_matches("anything", ""));
    }
}
