//! Conversation state management
//!
//! The message log plus loading/error flags. Every mutation builds a new
//! [`ConversationState`] and swaps it in whole, so a reader holding a
//! snapshot never observes a half-applied update. Snapshots are published
//! through a watch channel for the presentation layer.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::message::{Message, Part};

/// An immutable view of the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ConversationState {
    /// Look up a message by id.
    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// The last message in display order.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Shared snapshot handle.
pub type Snapshot = Arc<ConversationState>;

/// Owner of the conversation state.
pub struct ConversationStore {
    tx: watch::Sender<Snapshot>,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Arc::new(ConversationState::default()));
        Self { tx }
    }

    /// Create a store seeded with the given messages.
    pub fn with_messages(messages: Vec<Message>) -> Self {
        let store = Self::new();
        store.reset(messages);
        store
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Append a message to the end of the log.
    pub fn append(&self, message: Message) {
        debug!(id = %message.id, role = ?message.role, "Appending message");
        self.update(|state| state.messages.push(message));
    }

    /// Replace the parts of the message with `id`.
    ///
    /// Returns false if no such message exists (the log is left untouched).
    pub fn replace_parts(&self, id: &str, parts: Vec<Part>) -> bool {
        if self.tx.borrow().message(id).is_none() {
            return false;
        }
        self.update(|state| {
            if let Some(msg) = state.messages.iter_mut().find(|m| m.id == id) {
                msg.parts = parts;
            }
        });
        true
    }

    /// Remove every message whose id is in `ids`.
    pub fn remove(&self, ids: &[&str]) {
        debug!(?ids, "Removing messages");
        self.update(|state| state.messages.retain(|m| !ids.contains(&m.id.as_str())));
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.update(|state| state.is_loading = is_loading);
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update(|state| state.error = error);
    }

    /// Replace the log with `messages`, clearing the loading and error flags.
    pub fn reset(&self, messages: Vec<Message>) {
        self.tx.send_replace(Arc::new(ConversationState {
            messages,
            is_loading: false,
            error: None,
        }));
    }

    /// Build the next snapshot from a copy of the current one and publish it.
    fn update(&self, f: impl FnOnce(&mut ConversationState)) {
        let mut next = ConversationState::clone(&self.tx.borrow());
        f(&mut next);
        self.tx.send_replace(Arc::new(next));
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    fn greeting() -> Message {
        Message::model_text("initial-message", "Hello!")
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = ConversationStore::new();
        let snap = store.snapshot();
        assert!(snap.is_empty());
        assert!(!snap.is_loading);
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let store = ConversationStore::with_messages(vec![greeting()]);
        let user = Message::user(vec![Part::text("hi")]);
        let model = Message::model_placeholder();
        store.append(user.clone());
        store.append(model.clone());

        let snap = store.snapshot();
        let ids: Vec<&str> = snap.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["initial-message", user.id.as_str(), model.id.as_str()]);
    }

    #[test]
    fn test_old_snapshot_is_not_mutated() {
        let store = ConversationStore::new();
        let model = Message::model_placeholder();
        store.append(model.clone());

        let before = store.snapshot();
        assert!(store.replace_parts(&model.id, vec![Part::text("streamed")]));
        let after = store.snapshot();

        assert!(before.message(&model.id).unwrap().is_empty());
        assert_eq!(after.message(&model.id).unwrap().text(), "streamed");
    }

    #[test]
    fn test_replace_parts_unknown_id() {
        let store = ConversationStore::with_messages(vec![greeting()]);
        let before = store.snapshot();
        assert!(!store.replace_parts("missing", vec![Part::text("x")]));
        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn test_remove_multiple_ids() {
        let store = ConversationStore::with_messages(vec![greeting()]);
        let user = Message::user(vec![Part::text("hi")]);
        let model = Message::model_placeholder();
        store.append(user.clone());
        store.append(model.clone());

        store.remove(&[&user.id, &model.id]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.messages[0].role, Role::Model);
    }

    #[test]
    fn test_flags() {
        let store = ConversationStore::new();
        store.set_loading(true);
        store.set_error(Some("Error: boom".to_string()));
        let snap = store.snapshot();
        assert!(snap.is_loading);
        assert_eq!(snap.error.as_deref(), Some("Error: boom"));

        store.set_error(None);
        assert!(store.snapshot().error.is_none());
    }

    #[test]
    fn test_reset_clears_flags() {
        let store = ConversationStore::new();
        store.append(Message::user(vec![Part::text("hi")]));
        store.set_loading(true);
        store.set_error(Some("x".into()));

        store.reset(vec![greeting()]);
        let snap = store.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(!snap.is_loading);
        assert!(snap.error.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_snapshot() {
        let store = ConversationStore::new();
        let mut rx = store.subscribe();
        store.append(Message::user(vec![Part::text("one")]));
        store.append(Message::user(vec![Part::text("two")]));

        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.messages[1].text(), "two");
    }
}
