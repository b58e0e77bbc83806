//! Message-identity correlation.
//!
//! Every message carries a protocol-private `message_id` in its metadata and
//! may reference the message it replies to via `last_message_id`. Two maps
//! turn those ids into multi-turn task resumption: one from message id to the
//! task it belongs to, one from a message id to its reply. A follow-up turn
//! that names an earlier message re-joins that message's task, provided the
//! task is still open.

use a2a_types::{Message, Task, TaskState};
use std::collections::HashMap;

pub const METADATA_MESSAGE_ID: &str = "message_id";
pub const METADATA_LAST_MESSAGE_ID: &str = "last_message_id";
pub const METADATA_CONVERSATION_ID: &str = "conversation_id";

fn metadata_str<'a>(message: &'a Message, key: &str) -> Option<&'a str> {
    message.metadata.as_ref()?.get(key)?.as_str()
}

/// Id of this message, if its metadata carries one.
pub fn message_id(message: &Message) -> Option<&str> {
    metadata_str(message, METADATA_MESSAGE_ID)
}

/// Id of the message this one replies to, if any.
pub fn last_message_id(message: &Message) -> Option<&str> {
    metadata_str(message, METADATA_LAST_MESSAGE_ID)
}

/// Conversation this message belongs to, if its metadata carries one.
pub fn conversation_id(message: &Message) -> Option<&str> {
    metadata_str(message, METADATA_CONVERSATION_ID)
}

/// Whether a task still accepts follow-up turns.
pub fn task_still_open(task: &Task) -> bool {
    matches!(
        task.status.state,
        TaskState::Submitted | TaskState::Working | TaskState::InputRequired
    )
}

/// Append a message to the task history, idempotent on `message_id`.
///
/// A message without an id cannot be de-duplicated, so it is dropped with a
/// warning rather than appended twice on redelivery.
pub fn insert_message_history(task: &mut Task, message: &Message) {
    let Some(new_id) = message_id(message) else {
        tracing::warn!(task_id = %task.id, "message without message_id not added to history");
        return;
    };

    let history = task.history.get_or_insert_with(Vec::new);
    let already_present = history
        .iter()
        .any(|existing| message_id(existing) == Some(new_id));
    if already_present {
        tracing::debug!(task_id = %task.id, message_id = %new_id, "message already in history");
    } else {
        history.push(message.clone());
    }
}

/// Correlation maps for multi-turn resumption.
///
/// Entries live for the process lifetime; there is no eviction. The maps are
/// not internally synchronized, callers hold them behind the sink lock.
#[derive(Debug, Default)]
pub struct MessageCorrelator {
    task_of_message: HashMap<String, String>,
    next_message_id: HashMap<String, String>,
}

impl MessageCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which task a message belongs to.
    pub fn attach_message_to_task(&mut self, message: &Message, task_id: &str) {
        if let Some(id) = message_id(message) {
            self.task_of_message
                .insert(id.to_string(), task_id.to_string());
        }
    }

    /// Record the reply chain: the message named by `last_message_id` was
    /// answered by this message.
    pub fn insert_id_trace(&mut self, message: &Message) {
        if let (Some(id), Some(last)) = (message_id(message), last_message_id(message)) {
            self.next_message_id
                .insert(last.to_string(), id.to_string());
        }
    }

    /// Record both maps for a message observed on a task.
    pub fn observe(&mut self, message: &Message, task_id: &str) {
        self.attach_message_to_task(message, task_id);
        self.insert_id_trace(message);
    }

    /// Task that the named message belongs to. The caller still checks the
    /// task's openness against the store before resuming it.
    pub fn task_for_message(&self, message_id: &str) -> Option<&str> {
        self.task_of_message.get(message_id).map(String::as_str)
    }

    /// Reply recorded for the named message, if one arrived.
    pub fn reply_to(&self, message_id: &str) -> Option<&str> {
        self.next_message_id.get(message_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::{TaskStatus, TaskState};

    fn message_with_ids(id: &str, last: Option<&str>) -> Message {
        let mut metadata = HashMap::new();
        metadata.insert(
            METADATA_MESSAGE_ID.to_string(),
            serde_json::Value::String(id.to_string()),
        );
        if let Some(last) = last {
            metadata.insert(
                METADATA_LAST_MESSAGE_ID.to_string(),
                serde_json::Value::String(last.to_string()),
            );
        }
        Message {
            metadata: Some(metadata),
            ..Message::user_text("hello")
        }
    }

    fn task(id: &str, state: TaskState) -> Task {
        Task {
            id: id.to_string(),
            session_id: None,
            status: TaskStatus::new(state),
            artifacts: None,
            history: None,
            metadata: None,
        }
    }

    #[test]
    fn correlator_links_replies_to_tasks() {
        let mut correlator = MessageCorrelator::new();
        let first = message_with_ids("m1", None);
        correlator.observe(&first, "t1");

        let reply = message_with_ids("m2", Some("m1"));
        correlator.observe(&reply, "t1");

        assert_eq!(correlator.task_for_message("m2"), Some("t1"));
        assert_eq!(correlator.reply_to("m1"), Some("m2"));
        assert_eq!(correlator.task_for_message("m3"), None);
    }

    #[test]
    fn history_append_is_idempotent_on_message_id() {
        let mut t = task("t1", TaskState::Working);
        let message = message_with_ids("m1", None);

        insert_message_history(&mut t, &message);
        insert_message_history(&mut t, &message);

        assert_eq!(t.history.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn message_without_id_is_not_appended() {
        let mut t = task("t1", TaskState::Working);
        insert_message_history(&mut t, &Message::user_text("no id"));
        assert!(t.history.as_ref().map(Vec::is_empty).unwrap_or(true));
    }

    #[test]
    fn openness_follows_terminal_states() {
        assert!(task_still_open(&task("a", TaskState::Submitted)));
        assert!(task_still_open(&task("a", TaskState::InputRequired)));
        assert!(!task_still_open(&task("a", TaskState::Completed)));
        assert!(!task_still_open(&task("a", TaskState::Failed)));
    }
}
