use axum::{
    extract::State,
    response::{IntoResponse, Response, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use std::{convert::Infallible, sync::Arc, time::Duration};

use a2a_types::{
    A2ARequest, AgentCard, JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse,
    SendTaskStreamingResult, TaskUpdate,
};
use taskbridge::{HostError, TaskManager, UpdateStream};

use crate::error::Result;

/// State shared across all routes
#[derive(Clone)]
pub struct ServerState {
    pub manager: Arc<dyn TaskManager>,
    pub card: Arc<AgentCard>,
}

/// Create all A2A protocol routes: one JSON-RPC entry point plus the card.
pub fn create_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(rpc_endpoint).get(agent_card))
        .route("/.well-known/agent.json", get(agent_card))
        .with_state(state)
}

/// Single JSON-RPC entry point.
///
/// Validate the envelope, discriminate the method, execute, respond. Every
/// protocol-level failure is answered as an HTTP 200 with a JSON-RPC error
/// body; only infrastructure failures surface as HTTP errors.
async fn rpc_endpoint(State(state): State<ServerState>, body: String) -> Result<Response> {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => return Ok(rpc_error(None, JsonRpcError::parse_error(e.to_string()))),
    };
    let id = request.id.clone();

    let parsed = match A2ARequest::from_request(&request) {
        Ok(parsed) => parsed,
        Err(error) => return Ok(rpc_error(id, error)),
    };
    tracing::debug!(method = parsed.method(), "dispatching request");

    match parsed {
        A2ARequest::GetTask(params) => match state.manager.on_get_task(params).await {
            Ok(Some(task)) => Ok(rpc_success(id, serde_json::to_value(task)?)),
            Ok(None) => Ok(rpc_error(id, JsonRpcError::task_not_found())),
            Err(error) => Ok(rpc_error(id, rpc_error_for(&error))),
        },
        A2ARequest::SendTask(params) => match state.manager.on_send_task(params).await {
            Ok(task) => Ok(rpc_success(id, serde_json::to_value(task)?)),
            Err(error) => Ok(rpc_error(id, rpc_error_for(&error))),
        },
        A2ARequest::SendTaskSubscribe(params) => {
            match state.manager.on_send_task_subscribe(params).await {
                Ok(updates) => Ok(stream_updates(id, updates)),
                Err(error) => Ok(rpc_error(id, rpc_error_for(&error))),
            }
        }
    }
}

fn rpc_success(id: Option<JsonRpcId>, result: serde_json::Value) -> Response {
    Json(JsonRpcResponse::success(id, result)).into_response()
}

fn rpc_error(id: Option<JsonRpcId>, error: JsonRpcError) -> Response {
    Json(JsonRpcResponse::error(id, error)).into_response()
}

fn rpc_error_for(error: &HostError) -> JsonRpcError {
    match error {
        HostError::TaskTerminal { .. } | HostError::Validation { .. } => {
            JsonRpcError::invalid_params(error.to_string())
        }
        _ => JsonRpcError::internal(error.to_string()),
    }
}

/// Turn the manager's update stream into SSE frames.
///
/// Each update is one `data:` event whose payload is a complete JSON-RPC
/// response document with null fields omitted. Closing the stream is the
/// completion signal; there is no sentinel event.
fn stream_updates(id: Option<JsonRpcId>, updates: UpdateStream) -> Response {
    let sse_stream = updates.filter_map(move |update| {
        let id = id.clone();
        async move {
            let result = match update {
                TaskUpdate::Status(event) => SendTaskStreamingResult::Status(event),
                TaskUpdate::Artifact(event) => SendTaskStreamingResult::Artifact(event),
                // full snapshots have no streaming wire form
                TaskUpdate::Snapshot(_) => return None,
            };
            let response = JsonRpcResponse::success(
                id,
                serde_json::to_value(result).unwrap_or(serde_json::Value::Null),
            );
            Some(Ok::<_, Infallible>(
                axum::response::sse::Event::default()
                    .data(serde_json::to_string(&response).unwrap_or_default()),
            ))
        }
    });

    Sse::new(sse_stream)
        .keep_alive(
            axum::response::sse::KeepAlive::new()
                .interval(Duration::from_secs(30))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for the agent card (public)
async fn agent_card(State(state): State<ServerState>) -> Json<AgentCard> {
    Json((*state.card).clone())
}
