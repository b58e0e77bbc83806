//! # A2A (Agent2Agent) Protocol Types
//!
//! Rust data structures for the A2A task-exchange protocol: tasks with a
//! lifecycle state machine, chunked artifacts, messages, the JSON-RPC 2.0
//! envelope and the method-discriminated request union. The types are designed
//! for serialization and deserialization with `serde`; unset optional fields
//! are omitted from the wire.
//!
//! The protocol lets agents:
//! - Discover each other's capabilities via the `AgentCard`.
//! - Delegate and track collaborative `Task`s.
//! - Stream partial results as status and artifact update events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod agent_card;
pub use agent_card::{AgentCapabilities, AgentCard, AgentSkill};

// ============================================================================
// JSON-RPC 2.0 Base Types
// ============================================================================

/// JSON-RPC version string used by every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// Represents a JSON-RPC 2.0 identifier, which can be a string, number, or null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Integer(i64),
    Null,
}

/// Represents a JSON-RPC 2.0 Request object.
///
/// `params` is kept as a raw value here; it is decoded against the method's
/// parameter type when the request is discriminated into an [`A2ARequest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// The version of the JSON-RPC protocol. MUST be exactly "2.0".
    pub jsonrpc: String,
    /// A string containing the name of the method to be invoked.
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// A unique identifier established by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
}

impl JsonRpcRequest {
    pub fn new(id: JsonRpcId, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params: Some(params),
            id: Some(id),
        }
    }
}

/// Represents a JSON-RPC 2.0 Response object, carrying either a result or an
/// error, never both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonRpcId>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Represents a JSON-RPC 2.0 Error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Reserved protocol error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// A2A-specific: `tasks/get` addressed an unknown task id.
    pub const TASK_NOT_FOUND: i32 = -32001;
}

impl JsonRpcError {
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            code: error_codes::PARSE_ERROR,
            message: "Invalid JSON payload".to_string(),
            data: Some(serde_json::Value::String(detail.into())),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: error_codes::INVALID_REQUEST,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: error_codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: error_codes::INVALID_PARAMS,
            message: message.into(),
            data: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: error_codes::INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }

    pub fn task_not_found() -> Self {
        Self {
            code: error_codes::TASK_NOT_FOUND,
            message: "Task not found".to_string(),
            data: None,
        }
    }
}

// ============================================================================
// Core Protocol Types
// ============================================================================

/// Lifecycle state of a task.
///
/// `Completed`, `Canceled`, `Failed` and `Unknown` are terminal: once a task
/// reaches one of them it no longer accepts follow-up turns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Unknown,
}

impl TaskState {
    /// Whether this state closes the task.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Canceled | TaskState::Failed | TaskState::Unknown
        )
    }
}

/// Current status of a task: its lifecycle state, the message that produced
/// the transition (if any), and when it happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TaskStatus {
    pub fn new(state: TaskState) -> Self {
        Self {
            state,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_message(state: TaskState, message: Message) -> Self {
        Self {
            state,
            message: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// A unit of delegated work. Identity is `id`; later writes replace in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sessionId")]
    pub session_id: Option<String>,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<Message>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// One unit of message or artifact content, discriminated by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
    },
    Data {
        data: HashMap<String, serde_json::Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
    File {
        file: FileContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Error raised when a [`FileContent`] does not carry exactly one of
/// bytes/uri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFileContent;

impl std::fmt::Display for InvalidFileContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("exactly one of 'bytes' or 'uri' must be present in file content")
    }
}

impl std::error::Error for InvalidFileContent {}

/// File payload of a file part: either inline base64 `bytes` or a `uri`,
/// never both and never neither. The invariant is enforced at construction
/// and at deserialization, so an invalid value cannot reach a task store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawFileContent", rename_all = "camelCase")]
pub struct FileContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileContent {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    bytes: Option<String>,
    #[serde(default)]
    uri: Option<String>,
}

impl TryFrom<RawFileContent> for FileContent {
    type Error = InvalidFileContent;

    fn try_from(raw: RawFileContent) -> Result<Self, Self::Error> {
        FileContent::new(raw.name, raw.mime_type, raw.bytes, raw.uri)
    }
}

impl FileContent {
    /// Build a file payload, rejecting both-set and neither-set bytes/uri.
    pub fn new(
        name: Option<String>,
        mime_type: Option<String>,
        bytes: Option<String>,
        uri: Option<String>,
    ) -> Result<Self, InvalidFileContent> {
        match (&bytes, &uri) {
            (Some(_), None) | (None, Some(_)) => Ok(Self {
                name,
                mime_type,
                bytes,
                uri,
            }),
            _ => Err(InvalidFileContent),
        }
    }

    pub fn from_bytes(bytes: impl Into<String>) -> Self {
        Self {
            name: None,
            mime_type: None,
            bytes: Some(bytes.into()),
            uri: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            name: None,
            mime_type: None,
            bytes: None,
            uri: Some(uri.into()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn bytes(&self) -> Option<&str> {
        self.bytes.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

/// One conversational turn. Correlation ids (`message_id`, `last_message_id`,
/// `conversation_id`) travel in `metadata` rather than in the public schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Message {
    pub fn agent_text(text: impl Into<String>) -> Self {
        Self {
            role: "agent".to_string(),
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Text of the first part, if the message starts with a text part.
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().and_then(Part::as_text)
    }
}

/// One logical output object of a task, possibly delivered in ordered chunks.
///
/// `index` identifies the logical artifact stream within one task; `append`
/// and `last_chunk` drive chunk reassembly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "lastChunk")]
    pub last_chunk: Option<bool>,
}

// ============================================================================
// Method Parameter Types
// ============================================================================

/// Parameters of `tasks/send` and `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSendParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "sessionId")]
    pub session_id: Option<String>,
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none", rename = "historyLength")]
    pub history_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Parameters of `tasks/get`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "historyLength")]
    pub history_length: Option<usize>,
}

// ============================================================================
// Request Union
// ============================================================================

pub const METHOD_TASKS_GET: &str = "tasks/get";
pub const METHOD_TASKS_SEND: &str = "tasks/send";
pub const METHOD_TASKS_SEND_SUBSCRIBE: &str = "tasks/sendSubscribe";

/// The closed set of protocol methods, discriminated by the JSON-RPC `method`
/// field. Unknown methods and undecodable params are rejected here, before
/// any handler runs.
#[derive(Debug, Clone, PartialEq)]
pub enum A2ARequest {
    GetTask(TaskQueryParams),
    SendTask(TaskSendParams),
    SendTaskSubscribe(TaskSendParams),
}

impl A2ARequest {
    /// Discriminate a raw JSON-RPC request into a protocol request.
    pub fn from_request(request: &JsonRpcRequest) -> Result<Self, JsonRpcError> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcError::invalid_request(format!(
                "Invalid JSON-RPC version: {}",
                request.jsonrpc
            )));
        }

        let params = request
            .params
            .clone()
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;

        match request.method.as_str() {
            METHOD_TASKS_GET => serde_json::from_value(params)
                .map(A2ARequest::GetTask)
                .map_err(|e| JsonRpcError::invalid_params(e.to_string())),
            METHOD_TASKS_SEND => serde_json::from_value(params)
                .map(A2ARequest::SendTask)
                .map_err(|e| JsonRpcError::invalid_params(e.to_string())),
            METHOD_TASKS_SEND_SUBSCRIBE => serde_json::from_value(params)
                .map(A2ARequest::SendTaskSubscribe)
                .map_err(|e| JsonRpcError::invalid_params(e.to_string())),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            A2ARequest::GetTask(_) => METHOD_TASKS_GET,
            A2ARequest::SendTask(_) => METHOD_TASKS_SEND,
            A2ARequest::SendTaskSubscribe(_) => METHOD_TASKS_SEND_SUBSCRIBE,
        }
    }
}

// ============================================================================
// Streaming Event Types
// ============================================================================

/// Incremental status transition of a task, streamed over `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusUpdateEvent {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Incremental artifact chunk of a task, streamed over `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskArtifactUpdateEvent {
    pub id: String,
    pub artifact: Artifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// One item of a `tasks/sendSubscribe` result stream.
///
/// Status and artifact events are structurally disjoint (`status` vs
/// `artifact` field), so untagged decoding is unambiguous.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SendTaskStreamingResult {
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

/// The closed union of update shapes a peer can deliver for a task: a full
/// snapshot, a status transition, or an artifact chunk. Consumers switch on
/// the variant rather than probing structure.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Snapshot(Task),
    Status(TaskStatusUpdateEvent),
    Artifact(TaskArtifactUpdateEvent),
}

impl TaskUpdate {
    /// Id of the task this update addresses.
    pub fn task_id(&self) -> &str {
        match self {
            TaskUpdate::Snapshot(task) => &task.id,
            TaskUpdate::Status(event) => &event.id,
            TaskUpdate::Artifact(event) => &event.id,
        }
    }

    pub fn metadata(&self) -> Option<&HashMap<String, serde_json::Value>> {
        match self {
            TaskUpdate::Snapshot(task) => task.metadata.as_ref(),
            TaskUpdate::Status(event) => event.metadata.as_ref(),
            TaskUpdate::Artifact(event) => event.metadata.as_ref(),
        }
    }
}

impl From<SendTaskStreamingResult> for TaskUpdate {
    fn from(result: SendTaskStreamingResult) -> Self {
        match result {
            SendTaskStreamingResult::Status(event) => TaskUpdate::Status(event),
            SendTaskStreamingResult::Artifact(event) => TaskUpdate::Artifact(event),
        }
    }
}

// ============================================================================
// Service Types
// ============================================================================

/// Append-only audit record of one exchanged message; keyed by `id`,
/// retrieved sorted by timestamp for display. Not used for control flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub actor: String,
    pub content: Message,
    pub timestamp: DateTime<Utc>,
}

/// A logical grouping of messages under one session id, independent of task id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub conversation_id: String,
    pub is_active: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub task_ids: Vec<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_content_requires_exactly_one_source() {
        assert!(FileContent::new(None, None, Some("aGk=".into()), None).is_ok());
        assert!(FileContent::new(None, None, None, Some("file:///x".into())).is_ok());
        assert_eq!(
            FileContent::new(None, None, Some("aGk=".into()), Some("file:///x".into())),
            Err(InvalidFileContent)
        );
        assert_eq!(FileContent::new(None, None, None, None), Err(InvalidFileContent));
    }

    #[test]
    fn file_content_validation_applies_on_deserialize() {
        let both = r#"{"bytes":"aGk=","uri":"file:///x"}"#;
        assert!(serde_json::from_str::<FileContent>(both).is_err());

        let neither = r#"{"name":"report.pdf"}"#;
        assert!(serde_json::from_str::<FileContent>(neither).is_err());

        let ok: FileContent = serde_json::from_str(r#"{"uri":"file:///x","mimeType":"text/plain"}"#)
            .expect("valid file content");
        assert_eq!(ok.uri(), Some("file:///x"));
        assert_eq!(ok.mime_type(), Some("text/plain"));
    }

    #[test]
    fn part_is_discriminated_by_type_tag() {
        let part: Part = serde_json::from_str(r#"{"type":"text","text":"hi"}"#).unwrap();
        assert_eq!(part.as_text(), Some("hi"));

        let encoded = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(encoded["type"], "text");
    }

    #[test]
    fn unknown_method_is_rejected_before_dispatch() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: "tasks/cancel".to_string(),
            params: Some(serde_json::json!({"id": "t1"})),
            id: Some(JsonRpcId::Integer(1)),
        };
        let err = A2ARequest::from_request(&request).unwrap_err();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn malformed_params_report_invalid_params() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: METHOD_TASKS_GET.to_string(),
            params: Some(serde_json::json!({"historyLength": 3})),
            id: None,
        };
        let err = A2ARequest::from_request(&request).unwrap_err();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
    }

    #[test]
    fn response_omits_null_fields() {
        let ok = JsonRpcResponse::success(Some(JsonRpcId::Integer(7)), serde_json::json!({"a": 1}));
        let encoded = serde_json::to_string(&ok).unwrap();
        assert!(!encoded.contains("error"));

        let failed = JsonRpcResponse::error(None, JsonRpcError::task_not_found());
        let encoded = serde_json::to_string(&failed).unwrap();
        assert!(!encoded.contains("result"));
        assert!(encoded.contains("-32001"));
    }

    #[test]
    fn task_state_uses_kebab_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&TaskState::InputRequired).unwrap(),
            "\"input-required\""
        );
        assert!(TaskState::Completed.is_terminal());
        assert!(!TaskState::Working.is_terminal());
    }

    #[test]
    fn streaming_result_distinguishes_status_from_artifact() {
        let status = serde_json::json!({
            "id": "t1",
            "status": {"state": "working", "timestamp": "2026-01-01T00:00:00Z"},
            "final": false
        });
        let decoded: SendTaskStreamingResult = serde_json::from_value(status).unwrap();
        assert!(matches!(decoded, SendTaskStreamingResult::Status(_)));

        let artifact = serde_json::json!({
            "id": "t1",
            "artifact": {"parts": [{"type": "text", "text": "chunk"}], "index": 0}
        });
        let decoded: SendTaskStreamingResult = serde_json::from_value(artifact).unwrap();
        assert!(matches!(decoded, SendTaskStreamingResult::Artifact(_)));
    }
}
