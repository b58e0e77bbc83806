//! Ingestion point for task updates reported by peers.
//!
//! Every update shape a peer can deliver, full snapshot, status transition,
//! artifact chunk, or an outright failure to produce one, funnels through
//! [`TaskUpdateSink::apply`]. The sink owns the correlation maps and the
//! artifact reassembler behind one lock, and holds that lock across each
//! update's read-modify-write against the task store, so updates land in the
//! order the sink processes them and none is overwritten by a concurrent
//! apply. It leaves an audit event for each accepted update. The caller
//! always gets a task back; a failed update yields a synthetic FAILED task
//! rather than nothing.

use crate::correlation::{
    insert_message_history, MessageCorrelator, METADATA_CONVERSATION_ID, METADATA_MESSAGE_ID,
};
use crate::errors::HostResult;
use crate::events::EventLog;
use crate::task::artifacts::ArtifactReassembler;
use crate::task::task_store::TaskStore;
use a2a_types::{
    Message, Part, Task, TaskArtifactUpdateEvent, TaskState, TaskStatus, TaskStatusUpdateEvent,
    TaskUpdate,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A peer's report that it could not produce a usable update.
#[derive(Debug, Clone)]
pub struct UpdateFailure {
    /// The task the peer was working on, when it managed to say so.
    pub task_id: Option<String>,
    pub reason: String,
}

/// What a peer delivered: a well-formed update or a failure report.
pub type PeerUpdate = Result<TaskUpdate, UpdateFailure>;

struct SinkState {
    correlator: MessageCorrelator,
    reassembler: ArtifactReassembler,
}

pub struct TaskUpdateSink {
    store: Arc<dyn TaskStore>,
    events: Arc<EventLog>,
    state: Mutex<SinkState>,
}

impl TaskUpdateSink {
    pub fn new(store: Arc<dyn TaskStore>, events: Arc<EventLog>) -> Self {
        Self {
            store,
            events,
            state: Mutex::new(SinkState {
                correlator: MessageCorrelator::new(),
                reassembler: ArtifactReassembler::new(),
            }),
        }
    }

    /// Fold one peer update into stored task state and return the task.
    pub async fn apply(&self, update: PeerUpdate, actor: &str) -> HostResult<Task> {
        match update {
            Err(failure) => self.apply_failure(failure, actor).await,
            Ok(TaskUpdate::Status(event)) => self.apply_status(event, actor).await,
            Ok(TaskUpdate::Artifact(event)) => self.apply_artifact(event, actor).await,
            Ok(TaskUpdate::Snapshot(task)) => self.apply_snapshot(task, actor).await,
        }
    }

    /// Task that the named message belongs to, for resuming a reply chain.
    pub async fn task_for_reply(&self, last_message_id: &str) -> Option<String> {
        let state = self.state.lock().await;
        state
            .correlator
            .task_for_message(last_message_id)
            .map(str::to_string)
    }

    /// Record correlation ids for a message handled outside the sink, such as
    /// an inbound send accepted by the dispatcher.
    pub async fn observe_message(&self, message: &Message, task_id: &str) {
        let mut state = self.state.lock().await;
        state.correlator.observe(message, task_id);
    }

    /// Number of artifact chunk runs still waiting for their last chunk.
    pub async fn open_artifact_runs(&self) -> usize {
        let state = self.state.lock().await;
        state.reassembler.pending_count()
    }

    async fn apply_failure(&self, failure: UpdateFailure, actor: &str) -> HostResult<Task> {
        tracing::warn!(task_id = ?failure.task_id, reason = %failure.reason, "peer update failed");

        let mut metadata = HashMap::new();
        metadata.insert(
            METADATA_MESSAGE_ID.to_string(),
            serde_json::Value::String(Uuid::new_v4().to_string()),
        );
        let message = Message {
            role: "agent".to_string(),
            parts: vec![Part::text(format!("Task update failed: {}", failure.reason))],
            metadata: Some(metadata),
        };

        let task = Task {
            id: failure
                .task_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            session_id: None,
            status: TaskStatus::with_message(TaskState::Failed, message.clone()),
            artifacts: Some(Vec::new()),
            history: Some(Vec::new()),
            metadata: None,
        };
        self.store.replace(&task).await?;
        self.events.record(actor, message).await;
        Ok(task)
    }

    async fn apply_status(
        &self,
        event: TaskStatusUpdateEvent,
        actor: &str,
    ) -> HostResult<Task> {
        let session = event
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get(METADATA_CONVERSATION_ID))
            .and_then(serde_json::Value::as_str);

        // The state lock is held across fetch, mutate and replace: two
        // concurrent applies for the same task id must not read the same
        // snapshot and overwrite each other's write.
        let mut state = self.state.lock().await;
        let mut task = self.fetch_or_create(&event.id, session).await?;
        task.status = event.status.clone();

        if let Some(message) = &event.status.message {
            state.correlator.observe(message, &event.id);
            insert_message_history(&mut task, message);
        }
        if event.status.state.is_terminal() {
            state.reassembler.evict_task(&event.id);
        }

        self.store.replace(&task).await?;
        drop(state);

        let content = event
            .status
            .message
            .clone()
            .unwrap_or_else(|| Message::agent_text(state_label(event.status.state)));
        self.events.record(actor, content).await;
        Ok(task)
    }

    async fn apply_artifact(
        &self,
        event: TaskArtifactUpdateEvent,
        actor: &str,
    ) -> HostResult<Task> {
        let session = event
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get(METADATA_CONVERSATION_ID))
            .and_then(serde_json::Value::as_str);

        let mut state = self.state.lock().await;
        let mut task = self.fetch_or_create(&event.id, session).await?;
        state.reassembler.ingest(&mut task, &event);
        self.store.replace(&task).await?;
        drop(state);

        self.events
            .record(
                actor,
                Message {
                    role: "agent".to_string(),
                    parts: event.artifact.parts.clone(),
                    metadata: event.metadata.clone(),
                },
            )
            .await;
        Ok(task)
    }

    async fn apply_snapshot(&self, task: Task, actor: &str) -> HostResult<Task> {
        let mut state = self.state.lock().await;
        if let Some(message) = &task.status.message {
            state.correlator.observe(message, &task.id);
        }
        if task.status.state.is_terminal() {
            state.reassembler.evict_task(&task.id);
        }
        self.store.replace(&task).await?;
        drop(state);

        let content = task
            .status
            .message
            .clone()
            .unwrap_or_else(|| Message::agent_text(state_label(task.status.state)));
        self.events.record(actor, content).await;
        Ok(task)
    }

    async fn fetch_or_create(&self, task_id: &str, session: Option<&str>) -> HostResult<Task> {
        if let Some(task) = self.store.get(task_id, None).await? {
            return Ok(task);
        }
        Ok(Task {
            id: task_id.to_string(),
            session_id: Some(
                session
                    .map(str::to_string)
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            ),
            status: TaskStatus::new(TaskState::Submitted),
            artifacts: Some(Vec::new()),
            history: None,
            metadata: None,
        })
    }
}

fn state_label(state: TaskState) -> &'static str {
    match state {
        TaskState::Submitted => "submitted",
        TaskState::Working => "working",
        TaskState::InputRequired => "input-required",
        TaskState::Completed => "completed",
        TaskState::Canceled => "canceled",
        TaskState::Failed => "failed",
        TaskState::Unknown => "unknown",
    }
}
