//! Axum front end for an A2A task exchange.
//!
//! One JSON-RPC 2.0 endpoint at `POST /` carries `tasks/get`, `tasks/send`
//! and `tasks/sendSubscribe`; the last answers with a Server-Sent Events
//! stream. The agent card is served at `GET /` and
//! `GET /.well-known/agent.json`.

pub mod error;
pub mod routes;
pub mod server;

pub use error::{Error, Result};
pub use routes::ServerState;
pub use server::{A2AServer, A2AServerBuilder};
