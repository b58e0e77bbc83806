use a2a_types::TaskState;

/// Main error type for the task-exchange host
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    // === Task Errors ===
    #[error("Task is closed: {task_id} ({state:?})")]
    TaskTerminal { task_id: String, state: TaskState },

    // === Validation Errors ===
    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Infrastructure Errors ===
    #[error("Serialization error: {source}")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    #[error("Network error during {operation}: {reason}")]
    Network { operation: String, reason: String },

    #[error("Internal error in {component}: {reason}")]
    Internal { component: String, reason: String },
}

/// Result type alias for host operations
pub type HostResult<T> = Result<T, HostError>;

impl From<serde_json::Error> for HostError {
    fn from(source: serde_json::Error) -> Self {
        HostError::Serialization { source }
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        HostError::Internal {
            component: "io".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for HostError {
    fn from(err: tokio::task::JoinError) -> Self {
        HostError::Internal {
            component: "tokio".to_string(),
            reason: format!("task join failed: {err}"),
        }
    }
}
