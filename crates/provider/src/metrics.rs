//! Provider dispatch metrics.
//!
//! Emitted on every upstream call through the `metrics` facade. Recording
//! is synchronous, non-blocking, and infallible — a missing or broken
//! exporter can never affect the response path.

use ocore::Usage;
use std::time::Instant;

/// Record one upstream dispatch: latency, outcome, and token usage.
pub fn record_dispatch(
    provider: &'static str,
    model: &str,
    started: Instant,
    usage: Option<&Usage>,
    ok: bool,
) {
    let model = model.to_owned();
    let outcome = if ok { "ok" } else { "error" };

    metrics::histogram!(
        "orca_provider_latency_seconds",
        "provider" => provider,
        "model" => model.clone(),
    )
    .record(started.elapsed().as_secs_f64());

    metrics::counter!(
        "orca_provider_requests_total",
        "provider" => provider,
        "model" => model.clone(),
        "outcome" => outcome,
    )
    .increment(1);

    if let Some(usage) = usage {
        metrics::counter!(
            "orca_provider_prompt_tokens_total",
            "provider" => provider,
            "model" => model.clone(),
        )
        .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(
            "orca_provider_completion_tokens_total",
            "provider" => provider,
            "model" => model,
        )
        .increment(u64::from(usage.completion_tokens));
    }
}
