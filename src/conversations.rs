//! Conversation bookkeeping.
//!
//! A conversation groups messages and tasks under one session id. The
//! registry also prepares outbound messages (assigning a `message_id`,
//! linking the reply chain) and tracks which messages are still awaiting an
//! answer so a frontend can show progress.

use crate::correlation::{
    conversation_id, message_id, METADATA_LAST_MESSAGE_ID, METADATA_MESSAGE_ID,
};
use a2a_types::{Conversation, Message};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

const PENDING_PLACEHOLDER: &str = "Working...";

#[derive(Default)]
struct RegistryState {
    conversations: HashMap<String, Conversation>,
    // message_id -> latest status text, None while still in flight
    pending: HashMap<String, Option<String>>,
}

#[derive(Default)]
pub struct ConversationRegistry {
    inner: Mutex<RegistryState>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new active conversation with a generated id.
    pub async fn create(&self) -> Conversation {
        let conversation = Conversation {
            conversation_id: Uuid::new_v4().to_string(),
            is_active: true,
            name: String::new(),
            task_ids: Vec::new(),
            messages: Vec::new(),
        };
        let mut state = self.inner.lock().await;
        state
            .conversations
            .insert(conversation.conversation_id.clone(), conversation.clone());
        conversation
    }

    pub async fn get(&self, conversation_id: &str) -> Option<Conversation> {
        let state = self.inner.lock().await;
        state.conversations.get(conversation_id).cloned()
    }

    pub async fn list(&self) -> Vec<Conversation> {
        let state = self.inner.lock().await;
        state.conversations.values().cloned().collect()
    }

    /// Prepare a message for sending within a conversation: ensure it carries
    /// a `message_id` and link it to the conversation's latest message.
    pub async fn sanitize_message(&self, conversation: &str, mut message: Message) -> Message {
        let metadata = message.metadata.get_or_insert_with(HashMap::new);
        metadata
            .entry(METADATA_MESSAGE_ID.to_string())
            .or_insert_with(|| serde_json::Value::String(Uuid::new_v4().to_string()));

        let state = self.inner.lock().await;
        if let Some(existing) = state.conversations.get(conversation) {
            if let Some(latest) = existing.messages.last().and_then(message_id) {
                message
                    .metadata
                    .get_or_insert_with(HashMap::new)
                    .insert(
                        METADATA_LAST_MESSAGE_ID.to_string(),
                        serde_json::Value::String(latest.to_string()),
                    );
            }
        }
        message
    }

    /// File a message under the conversation named in its metadata.
    pub async fn record_message(&self, message: &Message) {
        let Some(id) = conversation_id(message).map(str::to_string) else {
            return;
        };
        let mut state = self.inner.lock().await;
        if let Some(conversation) = state.conversations.get_mut(&id) {
            conversation.messages.push(message.clone());
        }
    }

    pub async fn attach_task(&self, conversation_id: &str, task_id: &str) {
        let mut state = self.inner.lock().await;
        if let Some(conversation) = state.conversations.get_mut(conversation_id) {
            if !conversation.task_ids.iter().any(|id| id == task_id) {
                conversation.task_ids.push(task_id.to_string());
            }
        }
    }

    /// Mark a sent message as awaiting an answer.
    pub async fn mark_pending(&self, message_id: &str) {
        let mut state = self.inner.lock().await;
        state.pending.insert(message_id.to_string(), None);
    }

    /// Store the latest status text for a pending message.
    pub async fn resolve_pending(&self, message_id: &str, text: impl Into<String>) {
        let mut state = self.inner.lock().await;
        if let Some(slot) = state.pending.get_mut(message_id) {
            *slot = Some(text.into());
        }
    }

    pub async fn clear_pending(&self, message_id: &str) {
        let mut state = self.inner.lock().await;
        state.pending.remove(message_id);
    }

    /// Snapshot of in-flight messages with their display text.
    pub async fn pending_messages(&self) -> Vec<(String, String)> {
        let state = self.inner.lock().await;
        state
            .pending
            .iter()
            .map(|(id, text)| {
                let display = text.clone().unwrap_or_else(|| PENDING_PLACEHOLDER.to_string());
                (id.clone(), display)
            })
            .collect()
    }
}
