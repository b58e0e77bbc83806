use crate::errors::HostResult;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use a2a_types::{Task, TaskSendParams, TaskState, TaskStatus};

/// Abstraction for task persistence.
///
/// Task identity is the task id: `upsert` creates on first sight and appends
/// the new turn afterwards, `replace` overwrites wholesale. Callers express
/// "not found" at the protocol layer; the store just reports `None`.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create the task for these send params, or append the message to the
    /// existing task's history. Returns a snapshot of the stored task.
    async fn upsert(&self, params: &TaskSendParams) -> HostResult<Task>;

    /// Retrieve a task by id. `history_length` truncates the returned copy's
    /// history to the last N messages (0 means empty); `None` keeps it whole.
    /// Stored state is never truncated.
    async fn get(&self, task_id: &str, history_length: Option<usize>) -> HostResult<Option<Task>>;

    /// Overwrite the stored task (create or update) from this snapshot.
    async fn replace(&self, task: &Task) -> HostResult<()>;
}

/// Copy of a task with its history trimmed to the last `history_length`
/// messages. `Some(0)` empties the history; `None` keeps it whole.
pub fn trim_history(task: &Task, history_length: Option<usize>) -> Task {
    let mut copy = task.clone();
    if let (Some(limit), Some(history)) = (history_length, copy.history.as_mut()) {
        if limit == 0 {
            history.clear();
        } else if history.len() > limit {
            history.drain(..history.len() - limit);
        }
    }
    copy
}

/// In-memory implementation of TaskStore.
///
/// A single mutex over one map serializes every operation, so concurrent
/// sends for the same task id cannot interleave create and append. Suitable
/// for development and single-process deployments; tasks do not survive a
/// restart.
pub struct InMemoryTaskStore {
    tasks: Mutex<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    /// Create a new empty in-memory task store.
    ///
    /// Tasks accumulate for the process lifetime; use a database-backed
    /// implementation when persistence or eviction matters.
    pub fn new() -> Self {
        tracing::warn!(
            "InMemoryTaskStore created - tasks are held in process memory and will not persist"
        );
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Clear all tasks from storage. Primarily used for testing.
    pub async fn clear(&self) {
        let mut tasks = self.tasks.lock().await;
        tasks.clear();
    }

    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn upsert(&self, params: &TaskSendParams) -> HostResult<Task> {
        let mut tasks = self.tasks.lock().await;

        let task = tasks
            .entry(params.id.clone())
            .and_modify(|existing| {
                existing
                    .history
                    .get_or_insert_with(Vec::new)
                    .push(params.message.clone());
            })
            .or_insert_with(|| Task {
                id: params.id.clone(),
                session_id: params.session_id.clone(),
                status: TaskStatus::new(TaskState::Submitted),
                artifacts: None,
                history: Some(vec![params.message.clone()]),
                metadata: None,
            });

        Ok(task.clone())
    }

    async fn get(&self, task_id: &str, history_length: Option<usize>) -> HostResult<Option<Task>> {
        let tasks = self.tasks.lock().await;
        Ok(tasks
            .get(task_id)
            .map(|task| trim_history(task, history_length)))
    }

    async fn replace(&self, task: &Task) -> HostResult<()> {
        let mut tasks = self.tasks.lock().await;
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::Message;

    fn send_params(task_id: &str, text: &str) -> TaskSendParams {
        TaskSendParams {
            id: task_id.to_string(),
            session_id: Some("s1".to_string()),
            message: Message::user_text(text),
            history_length: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn upsert_creates_submitted_task_with_history() {
        let store = InMemoryTaskStore::new();
        let task = store.upsert(&send_params("t1", "hello")).await.unwrap();

        assert_eq!(task.id, "t1");
        assert_eq!(task.session_id.as_deref(), Some("s1"));
        assert_eq!(task.status.state, TaskState::Submitted);
        assert_eq!(task.history.as_ref().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn upsert_appends_later_turns() {
        let store = InMemoryTaskStore::new();
        store.upsert(&send_params("t1", "one")).await.unwrap();
        let task = store.upsert(&send_params("t1", "two")).await.unwrap();

        let history = task.history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].first_text(), Some("two"));
        // state is untouched by later sends
        assert_eq!(task.status.state, TaskState::Submitted);
    }

    #[tokio::test]
    async fn get_truncates_a_copy_not_the_stored_task() {
        let store = InMemoryTaskStore::new();
        for text in ["one", "two", "three"] {
            store.upsert(&send_params("t1", text)).await.unwrap();
        }

        let last_one = store.get("t1", Some(1)).await.unwrap().unwrap();
        assert_eq!(last_one.history.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            last_one.history.unwrap()[0].first_text(),
            Some("three")
        );

        let emptied = store.get("t1", Some(0)).await.unwrap().unwrap();
        assert_eq!(emptied.history.as_ref().map(Vec::len), Some(0));

        let full = store.get("t1", None).await.unwrap().unwrap();
        assert_eq!(full.history.as_ref().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn get_unknown_task_is_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.get("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_overwrites_wholesale() {
        let store = InMemoryTaskStore::new();
        let mut task = store.upsert(&send_params("t1", "hello")).await.unwrap();

        task.status = TaskStatus::new(TaskState::Completed);
        task.history = None;
        store.replace(&task).await.unwrap();

        let stored = store.get("t1", None).await.unwrap().unwrap();
        assert_eq!(stored.status.state, TaskState::Completed);
        assert!(stored.history.is_none());
    }

    #[tokio::test]
    async fn concurrent_upserts_yield_one_task_and_no_lost_turns() {
        use std::sync::Arc;
        use tokio::task::JoinSet;

        let store = Arc::new(InMemoryTaskStore::new());
        let mut join_set = JoinSet::new();
        for i in 0..10 {
            let store = Arc::clone(&store);
            join_set.spawn(async move {
                store
                    .upsert(&send_params("t1", &format!("turn {i}")))
                    .await
                    .unwrap();
            });
        }
        while let Some(result) = join_set.join_next().await {
            result.unwrap();
        }

        assert_eq!(store.len().await, 1);
        let task = store.get("t1", None).await.unwrap().unwrap();
        assert_eq!(task.history.as_ref().map(Vec::len), Some(10));
        assert_eq!(task.status.state, TaskState::Submitted);
    }
}
