//! Task state machinery.
//!
//! - `task_store`: persistence seam plus the in-memory implementation
//! - `artifacts`: chunked-artifact reassembly
//! - `update_sink`: single ingestion point for peer-reported task updates
//! - `task_manager`: per-method orchestration behind the dispatcher

pub mod artifacts;
pub mod task_manager;
pub mod task_store;
pub mod update_sink;

pub use artifacts::ArtifactReassembler;
pub use task_manager::{AgentRunner, HostTaskManager, TaskManager, UpdateStream};
pub use task_store::{trim_history, InMemoryTaskStore, TaskStore};
pub use update_sink::{PeerUpdate, TaskUpdateSink, UpdateFailure};
