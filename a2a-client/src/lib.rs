//! # A2A Protocol Client
//!
//! This crate provides a client for calling remote A2A (Agent-to-Agent) protocol
//! compliant agents. It supports both streaming and non-streaming task exchange
//! over HTTP/HTTPS.
//!
//! ## Features
//!
//! - JSON-RPC 2.0 request/response handling
//! - Unary task sends (`tasks/send`) and task retrieval (`tasks/get`)
//! - Streaming subscriptions (`tasks/sendSubscribe`) over Server-Sent Events
//! - Transparent fallback when a peer answers a subscription with a plain
//!   unary JSON response
//! - Agent discovery via agent cards
//!
//! ## Example
//!
//! ```rust,no_run
//! use a2a_client::A2AClient;
//! use a2a_types::{Message, TaskSendParams};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create client from agent card URL
//! let client = A2AClient::from_card_url("https://agent.example.com").await?;
//!
//! let params = TaskSendParams {
//!     id: "task-1".to_string(),
//!     session_id: None,
//!     message: Message::user_text("Hello!"),
//!     history_length: None,
//!     metadata: None,
//! };
//!
//! let task = client.send_task(params).await?;
//! println!("final state: {:?}", task.status.state);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod constants;
pub mod error;

pub use client::A2AClient;
pub use error::{A2AError, A2AResult};
