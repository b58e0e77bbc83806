//! Host-side core of an A2A task exchange.
//!
//! This crate holds everything between the wire (`a2a-types`,
//! `taskbridge-axum`, `a2a-client`) and the agent that does the thinking: the
//! task store, chunked-artifact reassembly, message-identity correlation for
//! multi-turn resumption, the update sink that folds peer reports into task
//! state, and the task manager the HTTP dispatcher routes to.

pub mod conversations;
pub mod correlation;
pub mod errors;
pub mod events;
pub mod task;

// Re-export key task management types for easier access
pub use task::{
    AgentRunner, HostTaskManager, InMemoryTaskStore, PeerUpdate, TaskManager, TaskStore,
    TaskUpdateSink, UpdateFailure, UpdateStream,
};

// Re-export key error types for easier access
pub use errors::{HostError, HostResult};

pub use conversations::ConversationRegistry;
pub use events::EventLog;
