//! A2A client for calling remote agents
//!
//! Supports unary task sends and streaming subscriptions over HTTP. A peer
//! that does not stream is handled transparently: its unary answer is folded
//! into a one-event stream, so callers consume every peer the same way.

use crate::constants::{AGENT_CARD_PATH, DEFAULT_UNARY_TIMEOUT, JSONRPC_VERSION};
use crate::error::{A2AError, A2AResult};
use a2a_types::{
    AgentCard, JsonRpcError, JsonRpcId, SendTaskStreamingResult, Task, TaskQueryParams,
    TaskSendParams, TaskStatusUpdateEvent, METHOD_TASKS_GET, METHOD_TASKS_SEND,
    METHOD_TASKS_SEND_SUBSCRIBE,
};
use futures_core::Stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A2A client for communicating with a remote agent
#[derive(Clone)]
pub struct A2AClient {
    /// HTTP client for making requests
    client: Client,
    /// Service endpoint URL from the agent card
    service_endpoint_url: String,
    /// Request ID counter for JSON-RPC requests
    request_id_counter: Arc<AtomicU64>,
}

/// Outbound JSON-RPC 2.0 request envelope
#[derive(Debug, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: String,
    id: JsonRpcId,
    method: String,
    params: T,
}

/// Inbound JSON-RPC 2.0 response envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonRpcResponse<T> {
    Success {
        #[allow(dead_code)]
        jsonrpc: String,
        id: Option<JsonRpcId>,
        result: T,
    },
    Error {
        #[allow(dead_code)]
        jsonrpc: String,
        #[allow(dead_code)]
        id: Option<JsonRpcId>,
        error: JsonRpcError,
    },
}

impl A2AClient {
    /// Create a client talking to the given service endpoint URL.
    pub fn from_url(url: impl Into<String>) -> A2AResult<Self> {
        Self::from_url_with_client(url, Client::new())
    }

    /// Create a client from a URL with a custom `reqwest::Client` (timeouts,
    /// proxies, TLS config, default headers).
    pub fn from_url_with_client(url: impl Into<String>, http_client: Client) -> A2AResult<Self> {
        let url = url.into();
        if url.is_empty() {
            return Err(A2AError::InvalidParameter {
                message: "Service endpoint URL must not be empty".to_string(),
            });
        }
        Ok(Self {
            client: http_client,
            service_endpoint_url: url,
            request_id_counter: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Create a client from an agent card, using the card's `url` as the
    /// service endpoint.
    pub fn from_card(agent_card: &AgentCard) -> A2AResult<Self> {
        if agent_card.url.is_empty() {
            return Err(A2AError::InvalidParameter {
                message: "Agent card does not contain a valid 'url' for the service endpoint"
                    .to_string(),
            });
        }
        Self::from_url(agent_card.url.clone())
    }

    /// Fetch the agent card from a base URL and build a client for the
    /// endpoint it names.
    pub async fn from_card_url(base_url: impl AsRef<str>) -> A2AResult<Self> {
        let card = fetch_agent_card(&Client::new(), base_url.as_ref()).await?;
        Self::from_card(&card)
    }

    /// Fetch a fresh agent card from a base URL.
    pub async fn fetch_agent_card(&self, base_url: impl AsRef<str>) -> A2AResult<AgentCard> {
        fetch_agent_card(&self.client, base_url.as_ref()).await
    }

    pub fn service_endpoint_url(&self) -> &str {
        &self.service_endpoint_url
    }

    /// Get the next request ID
    fn next_request_id(&self) -> JsonRpcId {
        let id = self.request_id_counter.fetch_add(1, Ordering::SeqCst);
        JsonRpcId::Integer(id as i64)
    }

    /// Helper method to make a unary JSON-RPC POST request
    async fn post_rpc_request<TParams, TResponse>(
        &self,
        method: &str,
        params: TParams,
    ) -> A2AResult<JsonRpcResponse<TResponse>>
    where
        TParams: Serialize,
        TResponse: for<'de> Deserialize<'de>,
    {
        let request_id = self.next_request_id();
        let rpc_request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
            id: request_id.clone(),
        };

        let response = self
            .client
            .post(&self.service_endpoint_url)
            .timeout(DEFAULT_UNARY_TIMEOUT)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&rpc_request)
            .send()
            .await
            .map_err(|e| A2AError::NetworkError {
                message: format!("Failed to send {} request: {}", method, e),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(A2AError::HttpError {
                status,
                message: error_text,
            });
        }

        let body = response.text().await.map_err(|e| A2AError::NetworkError {
            message: format!("Failed to read {} response: {}", method, e),
        })?;
        let json_response: JsonRpcResponse<TResponse> =
            serde_json::from_str(&body).map_err(|e| A2AError::SerializationError {
                message: format!("Failed to parse {} response: {}", method, e),
            })?;

        if let JsonRpcResponse::Success {
            id: Some(resp_id), ..
        } = &json_response
        {
            if resp_id != &request_id {
                tracing::warn!(
                    method,
                    "RPC response ID mismatch: expected {:?}, got {:?}",
                    request_id,
                    resp_id
                );
            }
        }

        Ok(json_response)
    }

    /// Send a task turn to the remote agent and wait for the final task.
    pub async fn send_task(&self, params: TaskSendParams) -> A2AResult<Task> {
        match self.post_rpc_request(METHOD_TASKS_SEND, params).await? {
            JsonRpcResponse::Success { result, .. } => Ok(result),
            JsonRpcResponse::Error { error, .. } => Err(A2AError::RemoteAgentError {
                message: error.message,
                code: Some(error.code),
            }),
        }
    }

    /// Get a specific task from the remote agent
    pub async fn get_task(&self, params: TaskQueryParams) -> A2AResult<Task> {
        match self.post_rpc_request(METHOD_TASKS_GET, params).await? {
            JsonRpcResponse::Success { result, .. } => Ok(result),
            JsonRpcResponse::Error { error, .. } => Err(A2AError::RemoteAgentError {
                message: error.message,
                code: Some(error.code),
            }),
        }
    }

    /// Send a task turn and subscribe to its update stream.
    ///
    /// When the peer streams, each SSE frame becomes one item. When the peer
    /// answers with a plain `application/json` unary response instead, the
    /// final task is folded into a single synthesized terminal status event,
    /// so the caller's consumption loop is the same either way.
    pub async fn send_task_streaming(
        &self,
        params: TaskSendParams,
    ) -> A2AResult<Pin<Box<dyn Stream<Item = A2AResult<SendTaskStreamingResult>> + Send>>> {
        let request_id = self.next_request_id();
        let rpc_request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: METHOD_TASKS_SEND_SUBSCRIBE.to_string(),
            params,
            id: request_id,
        };

        // No timeout here: the stream stays open for as long as the task runs.
        let response = self
            .client
            .post(&self.service_endpoint_url)
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&rpc_request)
            .send()
            .await
            .map_err(|e| A2AError::NetworkError {
                message: format!("Failed to send streaming task request: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            return Err(A2AError::HttpError {
                status,
                message: error_text,
            });
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.starts_with("text/event-stream") {
            return Ok(Box::pin(Self::parse_sse_stream(response.bytes_stream())));
        }

        if content_type.starts_with("application/json") {
            // Unary fallback: the peer does not stream.
            tracing::debug!("peer answered unary JSON; synthesizing a terminal status event");
            let body = response.text().await.map_err(|e| A2AError::NetworkError {
                message: format!("Failed to read unary fallback response: {}", e),
            })?;
            let task = decode_unary_task(&body)?;
            let event = SendTaskStreamingResult::Status(TaskStatusUpdateEvent {
                id: task.id,
                status: task.status,
                is_final: true,
                metadata: task.metadata,
            });
            return Ok(Box::pin(futures_util::stream::once(async move {
                Ok(event)
            })));
        }

        Err(A2AError::NetworkError {
            message: format!(
                "Invalid response Content-Type for task subscription. Expected 'text/event-stream' or 'application/json', got '{}'",
                content_type
            ),
        })
    }

    /// Turn the raw SSE byte stream into decoded subscription frames.
    ///
    /// The parser carries state across network chunks: a frame may arrive
    /// split at any byte, and one chunk may carry several frames.
    fn parse_sse_stream(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> impl Stream<Item = A2AResult<SendTaskStreamingResult>> + Send {
        use std::task::{Context, Poll};

        struct SseParser {
            inner: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
            // bytes received but not yet terminated by a newline
            partial_line: String,
            // data: payload of the frame currently being assembled
            frame_data: String,
            // decoded frames not yet handed to the consumer, last first
            ready: Vec<A2AResult<SendTaskStreamingResult>>,
        }

        impl SseParser {
            fn new(
                inner: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
            ) -> Self {
                Self {
                    inner: Box::pin(inner),
                    partial_line: String::new(),
                    frame_data: String::new(),
                    ready: Vec::new(),
                }
            }

            fn ingest_chunk(
                &mut self,
                chunk: bytes::Bytes,
            ) -> Vec<A2AResult<SendTaskStreamingResult>> {
                self.partial_line.push_str(&String::from_utf8_lossy(&chunk));

                let mut decoded = Vec::new();

                while let Some(newline_pos) = self.partial_line.find('\n') {
                    let line = self.partial_line[..newline_pos]
                        .trim_end_matches('\r')
                        .to_string();
                    self.partial_line = self.partial_line[newline_pos + 1..].to_string();

                    if line.is_empty() {
                        // blank line closes the frame
                        if !self.frame_data.is_empty() {
                            decoded.push(A2AClient::decode_sse_frame(&self.frame_data));
                            self.frame_data.clear();
                        }
                    } else if let Some(data) = line.strip_prefix("data:") {
                        if !self.frame_data.is_empty() {
                            self.frame_data.push('\n');
                        }
                        self.frame_data.push_str(data.trim_start());
                    }
                    // comment lines (":") and the event:/id:/retry: fields
                    // carry nothing this protocol uses
                }

                decoded
            }
        }

        impl Stream for SseParser {
            type Item = A2AResult<SendTaskStreamingResult>;

            fn poll_next(
                mut self: Pin<&mut Self>,
                cx: &mut Context<'_>,
            ) -> Poll<Option<Self::Item>> {
                // drain frames decoded on an earlier poll before reading more
                if let Some(result) = self.ready.pop() {
                    return Poll::Ready(Some(result));
                }

                match self.inner.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(chunk))) => {
                        let mut decoded = self.ingest_chunk(chunk);

                        if decoded.is_empty() {
                            // chunk ended mid-frame; ask to be polled again
                            cx.waker().wake_by_ref();
                            Poll::Pending
                        } else {
                            // reversed so pop() hands frames out in order
                            decoded.reverse();
                            self.ready = decoded;
                            Poll::Ready(self.ready.pop())
                        }
                    }
                    Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(A2AError::NetworkError {
                        message: format!("Stream error: {}", e),
                    }))),
                    Poll::Ready(None) => Poll::Ready(None),
                    Poll::Pending => Poll::Pending,
                }
            }
        }

        SseParser::new(byte_stream)
    }

    /// Decode one complete SSE frame's data payload.
    fn decode_sse_frame(json_data: &str) -> A2AResult<SendTaskStreamingResult> {
        if json_data.trim().is_empty() {
            return Err(A2AError::SerializationError {
                message: "Empty SSE event data".to_string(),
            });
        }

        let json_response: JsonRpcResponse<SendTaskStreamingResult> =
            serde_json::from_str(json_data).map_err(|e| A2AError::SerializationError {
                message: format!("Failed to parse SSE event data: {}", e),
            })?;

        match json_response {
            JsonRpcResponse::Success { result, .. } => Ok(result),
            JsonRpcResponse::Error { error, .. } => Err(A2AError::RemoteAgentError {
                message: format!("SSE event contained an error: {}", error.message),
                code: Some(error.code),
            }),
        }
    }
}

fn decode_unary_task(body: &str) -> A2AResult<Task> {
    let json_response: JsonRpcResponse<Task> =
        serde_json::from_str(body).map_err(|e| A2AError::SerializationError {
            message: format!("Failed to parse unary fallback response: {}", e),
        })?;
    match json_response {
        JsonRpcResponse::Success { result, .. } => Ok(result),
        JsonRpcResponse::Error { error, .. } => Err(A2AError::RemoteAgentError {
            message: error.message,
            code: Some(error.code),
        }),
    }
}

async fn fetch_agent_card(client: &Client, base_url: &str) -> A2AResult<AgentCard> {
    let base_url = base_url.trim_end_matches('/');
    let card_url = format!("{}/{}", base_url, AGENT_CARD_PATH);

    let response = client
        .get(&card_url)
        .timeout(DEFAULT_UNARY_TIMEOUT)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| A2AError::NetworkError {
            message: format!("Failed to fetch agent card from {}: {}", card_url, e),
        })?;

    if !response.status().is_success() {
        return Err(A2AError::HttpError {
            status: response.status().as_u16(),
            message: format!("Failed to fetch agent card from {}", card_url),
        });
    }

    response
        .json()
        .await
        .map_err(|e| A2AError::SerializationError {
            message: format!("Failed to parse agent card: {}", e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn client_requires_a_service_endpoint() {
        let card = AgentCard::new("Test", "", "1.0.0");
        assert!(matches!(
            A2AClient::from_card(&card),
            Err(A2AError::InvalidParameter { .. })
        ));
        assert!(A2AClient::from_url("http://localhost:10000").is_ok());
    }

    fn status_frame(task_id: &str, state: &str, is_final: bool) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": {
                    "id": task_id,
                    "status": {"state": state, "timestamp": "2026-01-01T00:00:00Z"},
                    "final": is_final
                }
            })
        )
    }

    #[tokio::test]
    async fn sse_parser_decodes_frames_split_across_chunks() {
        let frame_one = status_frame("t1", "working", false);
        let frame_two = status_frame("t1", "completed", true);
        // split the first frame mid-payload
        let (head, tail) = frame_one.split_at(20);

        let chunks = vec![
            Ok::<_, reqwest::Error>(bytes::Bytes::from(head.to_string())),
            Ok(bytes::Bytes::from(format!("{tail}{frame_two}"))),
        ];
        let stream = A2AClient::parse_sse_stream(futures_util::stream::iter(chunks));
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 2);
        match events[0].as_ref().unwrap() {
            SendTaskStreamingResult::Status(event) => {
                assert_eq!(event.id, "t1");
                assert!(!event.is_final);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        match events[1].as_ref().unwrap() {
            SendTaskStreamingResult::Status(event) => assert!(event.is_final),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn sse_parser_skips_comments_and_surfaces_error_frames() {
        let payload = format!(
            ": keep-alive\n\ndata: {}\n\n",
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32001, "message": "Task not found"}
            })
        );
        let chunks = vec![Ok::<_, reqwest::Error>(bytes::Bytes::from(payload))];
        let stream = A2AClient::parse_sse_stream(futures_util::stream::iter(chunks));
        let events: Vec<_> = stream.collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].as_ref().unwrap_err(),
            A2AError::RemoteAgentError {
                code: Some(-32001),
                ..
            }
        ));
    }

    #[test]
    fn unary_fallback_body_decodes_to_a_task() {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "id": "t1",
                "status": {
                    "state": "completed",
                    "message": {"role": "agent", "parts": [{"type": "text", "text": "done"}]},
                    "timestamp": "2026-01-01T00:00:00Z"
                }
            }
        })
        .to_string();

        let task = decode_unary_task(&body).unwrap();
        assert_eq!(task.id, "t1");
        assert_eq!(
            task.status.message.as_ref().and_then(|m| m.first_text()),
            Some("done")
        );
    }
}
