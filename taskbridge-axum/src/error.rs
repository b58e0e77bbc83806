use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure failures that escape the normal JSON-RPC response path.
///
/// Protocol-level errors (unknown method, bad params, unknown task) are
/// answered inline as HTTP 200 with a JSON-RPC error body; this type only
/// covers the cases where no such body could be produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Host error: {0}")]
    Host(#[from] taskbridge::HostError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::Host(e) => (StatusCode::INTERNAL_SERVER_ERROR, -32603, e.to_string()),
            Error::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                -32603,
                "Response serialization failed".to_string(),
            ),
            Error::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, -32603, msg.clone()),
        };

        let body = json!({
            "jsonrpc": "2.0",
            "error": {
                "code": error_code,
                "message": message,
            },
            "id": null
        });

        (status, Json(body)).into_response()
    }
}
