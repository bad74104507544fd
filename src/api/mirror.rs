use std::sync::Arc;

use crate::models::Message;
use crate::services::KeyValueStore;

/// Single on-device slot holding the last complete message list as JSON.
///
/// Every failure here is logged and swallowed: the room keeps working with
/// whatever it already has.
#[derive(Clone)]
pub struct LocalMirror {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl LocalMirror {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        LocalMirror {
            store,
            key: key.into(),
        }
    }

    /// Saved list, or `None` when the slot is empty, unreadable or unparseable.
    pub async fn load(&self) -> Option<Vec<Message>> {
        let raw = match self.store.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "failed to load local messages");
                return None;
            }
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) => {
                tracing::debug!(count = messages.len(), "local messages loaded");
                Some(messages)
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding unparseable local messages");
                None
            }
        }
    }

    /// Overwrite the slot with `messages`.
    pub async fn save(&self, messages: &[Message]) {
        let encoded = match serde_json::to_string(messages) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode messages for local mirror");
                return;
            }
        };

        if let Err(e) = self.store.set(&self.key, &encoded).await {
            tracing::warn!(key = %self.key, error = %e, "failed to save messages");
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key).await {
            tracing::warn!(key = %self.key, error = %e, "failed to clear local messages");
        }
    }
}
