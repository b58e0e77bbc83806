//! Append-only audit log of exchanged messages.
//!
//! Every accepted task update leaves one [`Event`] here. The log is display
//! material for operators and UIs; nothing reads it back for control flow.

use a2a_types::{Event, Message};
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<HashMap<String, Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event, generating its id and timestamp.
    pub async fn record(&self, actor: impl Into<String>, content: Message) -> Event {
        let event = Event {
            id: Uuid::new_v4().to_string(),
            actor: actor.into(),
            content,
            timestamp: Utc::now(),
        };
        let mut events = self.events.lock().await;
        events.insert(event.id.clone(), event.clone());
        event
    }

    /// All events, oldest first.
    pub async fn all(&self) -> Vec<Event> {
        let events = self.events.lock().await;
        let mut out: Vec<Event> = events.values().cloned().collect();
        out.sort_by_key(|event| event.timestamp);
        out
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_come_back_sorted_by_timestamp() {
        let log = EventLog::new();
        log.record("host", Message::agent_text("first")).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        log.record("peer", Message::agent_text("second")).await;

        let events = log.all().await;
        assert_eq!(events.len(), 2);
        assert!(events[0].timestamp <= events[1].timestamp);
        assert_eq!(events[0].content.first_text(), Some("first"));
    }
}
