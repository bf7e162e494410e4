use std::sync::Arc;

use dashmap::DashMap;

use novas_parts::ChatFile;

use crate::api::ChatOptions;

/// What the landing screen captured before the chat existed on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingChat {
    /// First message, sent once the session is ready.
    pub message: Option<String>,
    pub options: ChatOptions,
    pub files: Vec<ChatFile>,
}

impl PendingChat {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Pending chats keyed by their client-generated id, shared between screens.
#[derive(Clone, Default)]
pub struct PendingChatStore {
    inner: Arc<DashMap<String, PendingChat>>,
}

impl PendingChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `pending` under a fresh chat id and returns the id.
    pub fn stage(&self, pending: PendingChat) -> String {
        let chat_id = uuid::Uuid::new_v4().simple().to_string();
        self.inner.insert(chat_id.clone(), pending);
        chat_id
    }

    pub fn insert(&self, chat_id: impl Into<String>, pending: PendingChat) {
        self.inner.insert(chat_id.into(), pending);
    }

    pub fn contains(&self, chat_id: &str) -> bool {
        self.inner.contains_key(chat_id)
    }

    /// Removes and returns the pending data; each chat consumes it once.
    pub fn take(&self, chat_id: &str) -> Option<PendingChat> {
        self.inner.remove(chat_id).map(|(_, pending)| pending)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_chat_is_consumed_once() {
        let store = PendingChatStore::new();
        let shared = store.clone();
        let chat_id = store.stage(PendingChat::with_message("hello"));
        assert!(shared.contains(&chat_id));
        assert_eq!(shared.take(&chat_id).and_then(|p| p.message).as_deref(), Some("hello"));
        assert_eq!(store.take(&chat_id), None);
        assert!(store.is_empty());
    }
}
