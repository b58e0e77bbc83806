//! Constants for the A2A client

use std::time::Duration;

/// Default path to the agent card as per A2A specification
pub const AGENT_CARD_PATH: &str = ".well-known/agent.json";

/// JSON-RPC version
pub const JSONRPC_VERSION: &str = "2.0";

/// Per-request timeout for unary calls. Streaming requests run unbounded;
/// a client-level timeout would kill long-lived event streams.
pub const DEFAULT_UNARY_TIMEOUT: Duration = Duration::from_secs(60);
