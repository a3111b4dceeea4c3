//! Tests for the transcript store.

use ocore::Message;
use runtime::HistoryStore;
use std::sync::Arc;

#[tokio::test]
async fn add_assigns_id_and_timestamp() {
    let store = HistoryStore::new();
    let stored = store.add("conv-1", Message::user("hello")).await;

    assert!(!stored.id.is_empty());
    assert!(stored.created_at.is_some());

    let messages = store.get("conv-1").await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, stored.id);
}

#[tokio::test]
async fn add_preserves_existing_id() {
    let store = HistoryStore::new();
    let mut message = Message::user("hello");
    message.id = "msg-fixed".into();

    let stored = store.add("conv-1", message).await;
    assert_eq!(stored.id, "msg-fixed");
}

#[tokio::test]
async fn appends_keep_call_order() {
    let store = HistoryStore::new();
    for i in 0..5 {
        store.add("conv-1", Message::user(format!("m{i}"))).await;
    }

    let contents: Vec<_> = store
        .get("conv-1")
        .await
        .iter()
        .map(|m| m.content.flatten())
        .collect();
    assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn get_unknown_conversation_is_empty_and_creates_nothing() {
    let store = HistoryStore::new();
    assert!(store.get("missing").await.is_empty());
    assert!(!store.contains("missing"));
}

#[tokio::test]
async fn conversations_are_isolated() {
    let store = HistoryStore::new();
    store.add("a", Message::user("for a")).await;
    store.add("b", Message::user("for b")).await;

    assert_eq!(store.len("a").await, 1);
    assert_eq!(store.len("b").await, 1);
    assert_eq!(store.get("a").await[0].content.flatten(), "for a");
}

#[tokio::test]
async fn update_replaces_the_full_list() {
    let store = HistoryStore::new();
    store.add("conv-1", Message::user("old")).await;

    store
        .update("conv-1", vec![Message::user("new")])
        .await;

    let messages = store.get("conv-1").await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content.flatten(), "new");
}

#[tokio::test]
async fn update_with_is_atomic_with_appends() {
    // A slow read-modify-write under update_with must not lose a
    // concurrent append: the append waits for the writer lock.
    let store = Arc::new(HistoryStore::new());
    store.add("conv-1", Message::user("first")).await;

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store
                .update_with("conv-1", |messages| {
                    messages.push(Message::assistant("from update_with"));
                })
                .await;
        })
    };
    let appender = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            store.add("conv-1", Message::user("appended")).await;
        })
    };

    writer.await.unwrap();
    appender.await.unwrap();

    assert_eq!(store.len("conv-1").await, 3);
}

#[tokio::test]
async fn concurrent_appends_are_all_kept() {
    let store = Arc::new(HistoryStore::new());
    let mut handles = Vec::new();
    for i in 0..32 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.add("conv-1", Message::user(format!("m{i}"))).await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.len("conv-1").await, 32);
}
