//! Minimal A2A server: echoes every user turn back as the task's reply.
//!
//! Run with `cargo run --example echo_server`, then:
//!
//! ```text
//! curl -s http://localhost:3000/.well-known/agent.json
//! curl -s http://localhost:3000 -d '{"jsonrpc":"2.0","id":1,"method":"tasks/send",
//!   "params":{"id":"task-1","message":{"role":"user",
//!   "parts":[{"type":"text","text":"hello"}],"metadata":{"message_id":"m1"}}}}'
//! ```

use a2a_types::{AgentCard, Message};
use async_trait::async_trait;
use std::sync::Arc;
use taskbridge::{
    AgentRunner, EventLog, HostResult, HostTaskManager, InMemoryTaskStore, TaskManager, TaskStore,
    TaskUpdateSink,
};
use taskbridge_axum::A2AServer;

struct EchoRunner;

#[async_trait]
impl AgentRunner for EchoRunner {
    async fn respond(&self, _session_id: &str, message: &Message) -> HostResult<Message> {
        Ok(Message::agent_text(format!(
            "echo: {}",
            message.first_text().unwrap_or_default()
        )))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let store = Arc::new(InMemoryTaskStore::new());
    let events = Arc::new(EventLog::new());
    let sink = Arc::new(TaskUpdateSink::new(
        Arc::clone(&store) as Arc<dyn TaskStore>,
        events,
    ));
    let manager: Arc<dyn TaskManager> = Arc::new(HostTaskManager::new(
        store as Arc<dyn TaskStore>,
        Arc::new(EchoRunner),
        sink,
    ));

    let server = A2AServer::builder(
        AgentCard::new("Echo Agent", "http://localhost:3000", "0.1.0"),
        manager,
    )
    .with_card_config(|mut card| {
        card.description = Some("Echoes every user turn back".to_string());
        card
    })
    .build();

    server.serve("0.0.0.0:3000").await?;
    Ok(())
}
