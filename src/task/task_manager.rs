//! Task lifecycle orchestration for inbound protocol requests.
//!
//! The [`TaskManager`] trait is the seam between the HTTP dispatcher and the
//! host: one handler per protocol method. [`HostTaskManager`] implements it
//! by upserting the turn into the store, resolving multi-turn resumption
//! through the correlation maps, running the external [`AgentRunner`], and
//! feeding every transition through the update sink so there is exactly one
//! write path for task state.

use crate::correlation::{
    last_message_id, message_id, task_still_open, METADATA_LAST_MESSAGE_ID, METADATA_MESSAGE_ID,
};
use crate::errors::{HostError, HostResult};
use crate::task::task_store::{trim_history, TaskStore};
use crate::task::update_sink::{TaskUpdateSink, UpdateFailure};
use a2a_types::{
    Artifact, Message, Task, TaskArtifactUpdateEvent, TaskQueryParams, TaskSendParams, TaskState,
    TaskStatus, TaskStatusUpdateEvent, TaskUpdate,
};
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Updates produced while serving one `tasks/sendSubscribe` request.
pub type UpdateStream = Pin<Box<dyn Stream<Item = TaskUpdate> + Send>>;

const ACTOR_HOST: &str = "host";

/// Protocol-method handlers the dispatcher routes to.
#[async_trait]
pub trait TaskManager: Send + Sync {
    /// `tasks/get`: current task state, `None` for an unknown id.
    async fn on_get_task(&self, params: TaskQueryParams) -> HostResult<Option<Task>>;

    /// `tasks/send`: run the turn to completion and return the final task.
    async fn on_send_task(&self, params: TaskSendParams) -> HostResult<Task>;

    /// `tasks/sendSubscribe`: run the turn, streaming each transition as it
    /// happens. Stream close signals completion.
    async fn on_send_task_subscribe(&self, params: TaskSendParams) -> HostResult<UpdateStream>;
}

/// The agent that actually answers. Everything protocol-side stays out of
/// it: it sees a session id and the user's message and produces the reply.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn respond(&self, session_id: &str, message: &Message) -> HostResult<Message>;
}

pub struct HostTaskManager {
    store: Arc<dyn TaskStore>,
    runner: Arc<dyn AgentRunner>,
    sink: Arc<TaskUpdateSink>,
}

impl HostTaskManager {
    pub fn new(
        store: Arc<dyn TaskStore>,
        runner: Arc<dyn AgentRunner>,
        sink: Arc<TaskUpdateSink>,
    ) -> Self {
        Self {
            store,
            runner,
            sink,
        }
    }

    /// Decide which task this turn belongs to.
    ///
    /// A message that names a `last_message_id` re-joins the task of the
    /// message it replies to, provided that task is still open; a closed
    /// mapped task falls through to the caller-supplied id. Addressing a
    /// terminal task directly is refused.
    async fn resolve_target(&self, params: &TaskSendParams) -> HostResult<String> {
        if let Some(last) = last_message_id(&params.message) {
            if let Some(mapped) = self.sink.task_for_reply(last).await {
                if let Some(task) = self.store.get(&mapped, None).await? {
                    if task_still_open(&task) {
                        tracing::debug!(task_id = %mapped, "resuming task for reply chain");
                        return Ok(mapped);
                    }
                    tracing::debug!(task_id = %mapped, "mapped task is closed; starting fresh");
                }
            }
        }

        if let Some(existing) = self.store.get(&params.id, None).await? {
            if !task_still_open(&existing) {
                return Err(HostError::TaskTerminal {
                    task_id: existing.id,
                    state: existing.status.state,
                });
            }
        }
        Ok(params.id.clone())
    }

    async fn accept_turn(&self, params: &TaskSendParams) -> HostResult<Task> {
        let task = self.store.upsert(params).await?;
        self.sink.observe_message(&params.message, &task.id).await;
        Ok(task)
    }
}

/// A turn with no content has nothing to run the agent on.
fn validate_turn(params: &TaskSendParams) -> HostResult<()> {
    if params.message.parts.is_empty() {
        return Err(HostError::Validation {
            field: "message.parts".to_string(),
            reason: "message must carry at least one part".to_string(),
        });
    }
    Ok(())
}

fn working_event(task_id: &str) -> TaskStatusUpdateEvent {
    TaskStatusUpdateEvent {
        id: task_id.to_string(),
        status: TaskStatus::new(TaskState::Working),
        is_final: false,
        metadata: None,
    }
}

fn completed_event(task_id: &str, reply: Message) -> TaskStatusUpdateEvent {
    TaskStatusUpdateEvent {
        id: task_id.to_string(),
        status: TaskStatus::with_message(TaskState::Completed, reply),
        is_final: true,
        metadata: None,
    }
}

fn artifact_event(task_id: &str, reply: &Message) -> TaskArtifactUpdateEvent {
    TaskArtifactUpdateEvent {
        id: task_id.to_string(),
        artifact: Artifact {
            name: None,
            description: None,
            parts: reply.parts.clone(),
            metadata: None,
            index: 0,
            append: None,
            last_chunk: None,
        },
        metadata: None,
    }
}

/// Give the reply an id and link it back to the turn it answers, so the
/// correlation maps can carry the conversation across sends.
fn link_reply(mut reply: Message, request: &Message) -> Message {
    let metadata = reply.metadata.get_or_insert_with(HashMap::new);
    metadata
        .entry(METADATA_MESSAGE_ID.to_string())
        .or_insert_with(|| serde_json::Value::String(Uuid::new_v4().to_string()));
    if let Some(request_id) = message_id(request) {
        metadata
            .entry(METADATA_LAST_MESSAGE_ID.to_string())
            .or_insert_with(|| serde_json::Value::String(request_id.to_string()));
    }
    reply
}

#[async_trait]
impl TaskManager for HostTaskManager {
    async fn on_get_task(&self, params: TaskQueryParams) -> HostResult<Option<Task>> {
        self.store.get(&params.id, params.history_length).await
    }

    async fn on_send_task(&self, params: TaskSendParams) -> HostResult<Task> {
        validate_turn(&params)?;
        let target = self.resolve_target(&params).await?;
        let mut effective = params.clone();
        effective.id = target;
        let task = self.accept_turn(&effective).await?;

        let session = task.session_id.clone().unwrap_or_default();
        self.sink
            .apply(Ok(TaskUpdate::Status(working_event(&task.id))), ACTOR_HOST)
            .await?;

        let final_task = match self.runner.respond(&session, &effective.message).await {
            Ok(reply) => {
                let reply = link_reply(reply, &effective.message);
                self.sink
                    .apply(
                        Ok(TaskUpdate::Status(completed_event(&task.id, reply))),
                        ACTOR_HOST,
                    )
                    .await?
            }
            Err(err) => {
                self.sink
                    .apply(
                        Err(UpdateFailure {
                            task_id: Some(task.id.clone()),
                            reason: err.to_string(),
                        }),
                        ACTOR_HOST,
                    )
                    .await?
            }
        };
        Ok(trim_history(&final_task, params.history_length))
    }

    async fn on_send_task_subscribe(&self, params: TaskSendParams) -> HostResult<UpdateStream> {
        validate_turn(&params)?;
        let target = self.resolve_target(&params).await?;
        let mut effective = params;
        effective.id = target;
        let task = self.accept_turn(&effective).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::clone(&self.sink);
        let runner = Arc::clone(&self.runner);
        let session = task.session_id.clone().unwrap_or_default();
        let task_id = task.id.clone();
        let message = effective.message.clone();

        // The forwarding task owns the sender. If the subscriber goes away
        // the sends fail silently and the turn still runs to completion in
        // the store.
        tokio::spawn(async move {
            let working = TaskUpdate::Status(working_event(&task_id));
            if sink.apply(Ok(working.clone()), ACTOR_HOST).await.is_ok() {
                let _ = tx.send(working);
            }

            match runner.respond(&session, &message).await {
                Ok(reply) => {
                    let reply = link_reply(reply, &message);
                    let artifact = TaskUpdate::Artifact(artifact_event(&task_id, &reply));
                    if sink.apply(Ok(artifact.clone()), ACTOR_HOST).await.is_ok() {
                        let _ = tx.send(artifact);
                    }
                    let done = TaskUpdate::Status(completed_event(&task_id, reply));
                    if sink.apply(Ok(done.clone()), ACTOR_HOST).await.is_ok() {
                        let _ = tx.send(done);
                    }
                }
                Err(err) => {
                    let outcome = sink
                        .apply(
                            Err(UpdateFailure {
                                task_id: Some(task_id.clone()),
                                reason: err.to_string(),
                            }),
                            ACTOR_HOST,
                        )
                        .await;
                    if let Ok(failed) = outcome {
                        let _ = tx.send(TaskUpdate::Status(TaskStatusUpdateEvent {
                            id: failed.id,
                            status: failed.status,
                            is_final: true,
                            metadata: None,
                        }));
                    }
                }
            }
        });

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::task::task_store::InMemoryTaskStore;
    use futures::StreamExt;

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

    struct FailingRunner;

    #[async_trait]
    impl AgentRunner for FailingRunner {
        async fn respond(&self, _session_id: &str, _message: &Message) -> HostResult<Message> {
            Err(HostError::Internal {
                component: "runner".to_string(),
                reason: "model unavailable".to_string(),
            })
        }
    }

    fn manager(runner: Arc<dyn AgentRunner>) -> (Arc<InMemoryTaskStore>, HostTaskManager) {
        let store = Arc::new(InMemoryTaskStore::new());
        let events = Arc::new(EventLog::new());
        let sink = Arc::new(TaskUpdateSink::new(
            Arc::clone(&store) as Arc<dyn TaskStore>,
            events,
        ));
        let manager = HostTaskManager::new(Arc::clone(&store) as Arc<dyn TaskStore>, runner, sink);
        (store, manager)
    }

    fn send_params(task_id: &str, text: &str, message_id: &str) -> TaskSendParams {
        let mut metadata = HashMap::new();
        metadata.insert(
            METADATA_MESSAGE_ID.to_string(),
            serde_json::Value::String(message_id.to_string()),
        );
        TaskSendParams {
            id: task_id.to_string(),
            session_id: Some("s1".to_string()),
            message: Message {
                metadata: Some(metadata),
                ..Message::user_text(text)
            },
            history_length: None,
            metadata: None,
        }
    }

    fn with_reply_link(mut params: TaskSendParams, last: &str) -> TaskSendParams {
        params.message.metadata.as_mut().unwrap().insert(
            METADATA_LAST_MESSAGE_ID.to_string(),
            serde_json::Value::String(last.to_string()),
        );
        params
    }

    #[tokio::test]
    async fn send_task_runs_the_turn_to_completion() {
        let (store, manager) = manager(Arc::new(EchoRunner));
        let task = manager
            .on_send_task(send_params("t1", "hi", "m1"))
            .await
            .unwrap();

        assert_eq!(task.id, "t1");
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(
            task.status.message.as_ref().and_then(Message::first_text),
            Some("echo: hi")
        );
        // history holds the user turn and the linked reply
        let history = task.history.as_ref().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(last_message_id(&history[1]), Some("m1"));

        assert!(store.get("t1", None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn send_task_honors_history_length() {
        let (store, manager) = manager(Arc::new(EchoRunner));
        let mut params = send_params("t1", "hi", "m1");
        params.history_length = Some(1);
        let task = manager.on_send_task(params).await.unwrap();

        assert_eq!(task.history.as_ref().map(Vec::len), Some(1));
        // stored history stays whole
        let stored = store.get("t1", None).await.unwrap().unwrap();
        assert_eq!(stored.history.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn reply_chain_resumes_an_open_task() {
        let (store, manager) = manager(Arc::new(EchoRunner));

        // a peer left t1 waiting for input, its question carries id m-agent
        let mut question_metadata = HashMap::new();
        question_metadata.insert(
            METADATA_MESSAGE_ID.to_string(),
            serde_json::Value::String("m-agent".to_string()),
        );
        let question = Message {
            metadata: Some(question_metadata),
            ..Message::agent_text("which city?")
        };
        manager
            .sink
            .apply(
                Ok(TaskUpdate::Status(TaskStatusUpdateEvent {
                    id: "t1".to_string(),
                    status: TaskStatus::with_message(TaskState::InputRequired, question),
                    is_final: false,
                    metadata: None,
                })),
                "remote-agent",
            )
            .await
            .unwrap();

        // the answer names m-agent, so it re-joins t1 despite asking for t2
        let params = with_reply_link(send_params("t2", "paris", "m2"), "m-agent");
        let task = manager.on_send_task(params).await.unwrap();

        assert_eq!(task.id, "t1");
        assert!(store.get("t2", None).await.unwrap().is_none());
        let texts: Vec<_> = task
            .history
            .as_ref()
            .unwrap()
            .iter()
            .filter_map(Message::first_text)
            .collect();
        assert_eq!(texts, vec!["which city?", "paris", "echo: paris"]);
    }

    #[tokio::test]
    async fn reply_chain_to_a_closed_task_starts_fresh() {
        let (store, manager) = manager(Arc::new(EchoRunner));
        let first = manager
            .on_send_task(send_params("t1", "hi", "m1"))
            .await
            .unwrap();
        let reply_id = message_id(&first.history.as_ref().unwrap()[1])
            .unwrap()
            .to_string();

        // t1 is completed, so the follow-up lands on the requested id
        let params = with_reply_link(send_params("t2", "more", "m2"), &reply_id);
        let task = manager.on_send_task(params).await.unwrap();
        assert_eq!(task.id, "t2");
        assert!(store.get("t2", None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn direct_send_to_a_terminal_task_is_refused() {
        let (_store, manager) = manager(Arc::new(EchoRunner));
        manager
            .on_send_task(send_params("t1", "hi", "m1"))
            .await
            .unwrap();

        let err = manager
            .on_send_task(send_params("t1", "again", "m2"))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::TaskTerminal { .. }));
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_any_state_changes() {
        let (store, manager) = manager(Arc::new(EchoRunner));
        let mut params = send_params("t1", "unused", "m1");
        params.message.parts.clear();

        let err = manager.on_send_task(params).await.unwrap_err();
        assert!(matches!(err, HostError::Validation { .. }));
        assert!(store.get("t1", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn runner_failure_returns_a_failed_task() {
        let (_store, manager) = manager(Arc::new(FailingRunner));
        let task = manager
            .on_send_task(send_params("t1", "hi", "m1"))
            .await
            .unwrap();

        assert_eq!(task.status.state, TaskState::Failed);
        let text = task.status.message.as_ref().unwrap().first_text().unwrap();
        assert!(text.contains("model unavailable"));
    }

    #[tokio::test]
    async fn subscribe_streams_working_artifact_then_final_status() {
        let (store, manager) = manager(Arc::new(EchoRunner));
        let stream = manager
            .on_send_task_subscribe(send_params("t1", "hi", "m1"))
            .await
            .unwrap();

        let updates: Vec<TaskUpdate> = stream.collect().await;
        assert_eq!(updates.len(), 3);
        assert!(matches!(
            &updates[0],
            TaskUpdate::Status(event) if event.status.state == TaskState::Working && !event.is_final
        ));
        assert!(matches!(&updates[1], TaskUpdate::Artifact(_)));
        assert!(matches!(
            &updates[2],
            TaskUpdate::Status(event) if event.status.state == TaskState::Completed && event.is_final
        ));

        let stored = store.get("t1", None).await.unwrap().unwrap();
        assert_eq!(stored.status.state, TaskState::Completed);
        assert_eq!(stored.artifacts.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn subscribe_failure_ends_with_a_final_failed_status() {
        let (_store, manager) = manager(Arc::new(FailingRunner));
        let stream = manager
            .on_send_task_subscribe(send_params("t1", "hi", "m1"))
            .await
            .unwrap();

        let updates: Vec<TaskUpdate> = stream.collect().await;
        let last = updates.last().unwrap();
        assert!(matches!(
            last,
            TaskUpdate::Status(event) if event.status.state == TaskState::Failed && event.is_final
        ));
    }
}
