//! Tests for webhook reconciliation.

use ocore::Message;
use runtime::{HistoryStore, WebhookPayload, reconcile};
use serde_json::json;

async fn store_with_pending(job_id: &str) -> HistoryStore {
    let store = HistoryStore::new();
    store.add("conv-1", Message::user("make me a song")).await;

    let mut pending = Message::assistant("Job submitted.");
    pending.status = "submitted".into();
    pending.data = Some(json!({"id": job_id, "provider": "replicate", "status": "starting"}));
    store.add("conv-1", pending).await;
    store
}

fn payload(job_id: &str) -> WebhookPayload {
    WebhookPayload {
        id: job_id.into(),
        status: Some("succeeded".into()),
        output: Some(json!(["https://cdn.example/song.mp3"])),
        error: None,
        logs: Some("generated in 42s".into()),
    }
}

#[tokio::test]
async fn merges_payload_into_pending_entry() {
    let store = store_with_pending("job-1").await;
    reconcile(&store, "conv-1", &payload("job-1")).await.unwrap();

    let messages = store.get("conv-1").await;
    let data = messages[1].data.as_ref().unwrap();
    assert_eq!(data["id"], "job-1");
    assert_eq!(data["status"], "succeeded");
    assert_eq!(data["output"][0], "https://cdn.example/song.mp3");
    // Fields not in the payload survive the merge.
    assert_eq!(data["provider"], "replicate");
    assert_eq!(messages[1].status, "succeeded");
}

#[tokio::test]
async fn redelivery_is_idempotent() {
    let store = store_with_pending("job-1").await;
    let payload = payload("job-1");

    reconcile(&store, "conv-1", &payload).await.unwrap();
    let first = serde_json::to_string(&store.get("conv-1").await).unwrap();

    reconcile(&store, "conv-1", &payload).await.unwrap();
    let second = serde_json::to_string(&store.get("conv-1").await).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_job_is_not_found_and_leaves_history_unmodified() {
    let store = store_with_pending("job-1").await;
    let before = serde_json::to_string(&store.get("conv-1").await).unwrap();

    let err = reconcile(&store, "conv-1", &payload("job-other"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ocore::Error>(),
        Some(ocore::Error::NotFound(_))
    ));

    let after = serde_json::to_string(&store.get("conv-1").await).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn webhook_fields_win_on_conflict() {
    let store = store_with_pending("job-1").await;

    // First delivery reports failure, a retried job later succeeds.
    let failed = WebhookPayload {
        id: "job-1".into(),
        status: Some("failed".into()),
        output: None,
        error: Some(json!({"detail": "OOM"})),
        logs: None,
    };
    reconcile(&store, "conv-1", &failed).await.unwrap();
    reconcile(&store, "conv-1", &payload("job-1")).await.unwrap();

    let messages = store.get("conv-1").await;
    let data = messages[1].data.as_ref().unwrap();
    assert_eq!(data["status"], "succeeded");
    // The stale error field remains from the earlier delivery; the
    // merge is shallow, not clearing.
    assert_eq!(data["error"]["detail"], "OOM");
}
