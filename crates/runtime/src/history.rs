//! Conversation transcript store.
//!
//! Keyed by conversation id. The outer map hands out one async mutex per
//! conversation, which is the at-most-one-writer guarantee: both the
//! synchronous turn path and the webhook reconciler target the same
//! entries, and a reconciler read-modify-write racing a concurrent
//! append would silently drop the newer message. Cross-conversation
//! operations need no coordination.

use compact_str::CompactString;
use ocore::Message;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Append-only-per-turn transcript store.
#[derive(Default)]
pub struct HistoryStore {
    conversations: parking_lot::Mutex<BTreeMap<CompactString, Arc<Mutex<Vec<Message>>>>>,
}

impl HistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The per-conversation entry, created on first touch.
    fn entry(&self, conversation: &str) -> Arc<Mutex<Vec<Message>>> {
        let mut conversations = self.conversations.lock();
        conversations
            .entry(CompactString::from(conversation))
            .or_default()
            .clone()
    }

    /// Append a message, assigning an id and timestamp when absent.
    /// Returns the stored copy.
    pub async fn add(&self, conversation: &str, mut message: Message) -> Message {
        if message.id.is_empty() {
            message.id = CompactString::from(ulid::Ulid::new().to_string());
        }
        if message.created_at.is_none() {
            message.created_at = Some(chrono::Utc::now());
        }

        let entry = self.entry(conversation);
        let mut messages = entry.lock().await;
        messages.push(message.clone());
        message
    }

    /// The full message list for a conversation (empty when unknown;
    /// reading never creates an entry).
    pub async fn get(&self, conversation: &str) -> Vec<Message> {
        let entry = {
            let conversations = self.conversations.lock();
            conversations.get(conversation).cloned()
        };
        match entry {
            Some(entry) => entry.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Replace the full message list. Reconciler use only.
    pub async fn update(&self, conversation: &str, messages: Vec<Message>) {
        let entry = self.entry(conversation);
        *entry.lock().await = messages;
    }

    /// Run `f` on the message list under the conversation's writer lock.
    ///
    /// This is the atomic read-modify-write primitive; everything the
    /// reconciler does goes through it.
    pub async fn update_with<R>(
        &self,
        conversation: &str,
        f: impl FnOnce(&mut Vec<Message>) -> R,
    ) -> R {
        let entry = self.entry(conversation);
        let mut messages = entry.lock().await;
        f(&mut messages)
    }

    /// Number of messages in a conversation.
    pub async fn len(&self, conversation: &str) -> usize {
        self.get(conversation).await.len()
    }

    /// Whether the store has an entry for this conversation.
    pub fn contains(&self, conversation: &str) -> bool {
        self.conversations.lock().contains_key(conversation)
    }
}
