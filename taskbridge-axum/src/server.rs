use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use a2a_types::AgentCard;
use taskbridge::TaskManager;

use crate::routes::{create_routes, ServerState};

/// A2A protocol server over a task manager.
pub struct A2AServer {
    card: Arc<AgentCard>,
    manager: Arc<dyn TaskManager>,
}

impl A2AServer {
    /// Create a new A2A server builder
    pub fn builder(card: AgentCard, manager: Arc<dyn TaskManager>) -> A2AServerBuilder {
        A2AServerBuilder::new(card, manager)
    }

    /// Display server startup information including agent card details
    fn display_server_info(&self, local_addr: &std::net::SocketAddr) {
        let card = &self.card;
        tracing::info!("A2A Server Starting");
        tracing::info!("Server listening at: http://{}", local_addr);
        tracing::info!(
            "Agent: {} ({})",
            card.name,
            card.description.as_deref().unwrap_or("no description")
        );
        tracing::info!(
            "Agent Card available at: http://{}/.well-known/agent.json",
            local_addr
        );
        tracing::info!("  Version: {}", card.version);
        tracing::info!("  URL: {}", card.url);
        tracing::info!(
            "  Streaming: {}",
            if card.capabilities.streaming {
                "enabled"
            } else {
                "disabled"
            }
        );

        if card.skills.is_empty() {
            tracing::info!("  Skills: none configured");
        } else {
            tracing::info!("  Skills: {} configured", card.skills.len());
            for skill in &card.skills {
                tracing::info!("    - {} ({})", skill.name, skill.id);
            }
        }
    }

    /// Validate agent card configuration and warn about potential issues
    fn validate_agent_card(&self, local_addr: &std::net::SocketAddr) {
        let card = &self.card;
        let server_url = format!("http://{}", local_addr);
        let mut warnings = Vec::new();

        if card.name.is_empty() {
            warnings.push("agent card name is empty".to_string());
        }
        if card.version.is_empty() {
            warnings.push(
                "version is empty - other agents may have trouble identifying compatibility"
                    .to_string(),
            );
        }
        if card.url.is_empty() {
            warnings
                .push("URL is empty - other agents will not know how to reach this agent".to_string());
        } else if card.url.trim_end_matches('/') != server_url.trim_end_matches('/') {
            warnings.push(format!(
                "URL in the card ({}) differs from server address ({})",
                card.url.trim_end_matches('/'),
                server_url
            ));
        }
        if !card.capabilities.streaming {
            warnings.push("streaming is disabled; peers will fall back to unary sends".to_string());
        }

        for warning in warnings {
            tracing::warn!("agent card: {}", warning);
        }
    }

    /// Convert the server into an Axum router
    pub fn into_router(self) -> Router {
        let state = ServerState {
            manager: self.manager,
            card: self.card,
        };

        create_routes(state).layer(CorsLayer::permissive())
    }

    /// Run the server on the specified address
    pub async fn serve(self, addr: impl tokio::net::ToSocketAddrs) -> Result<(), std::io::Error> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        self.display_server_info(&local_addr);
        self.validate_agent_card(&local_addr);

        let app = self.into_router();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Builder for configuring an A2A server
pub struct A2AServerBuilder {
    card: AgentCard,
    manager: Arc<dyn TaskManager>,
}

impl A2AServerBuilder {
    fn new(card: AgentCard, manager: Arc<dyn TaskManager>) -> Self {
        Self { card, manager }
    }

    /// Adjust the agent card (useful for setting URL, version, etc.)
    pub fn with_card_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AgentCard) -> AgentCard,
    {
        self.card = f(self.card);
        self
    }

    /// Build the A2A server, filling in defaults the card left out.
    pub fn build(mut self) -> A2AServer {
        if self.card.url.is_empty() {
            self.card.url = "http://localhost:3000".to_string();
        }
        if self.card.version.is_empty() {
            self.card.version = "0.1.0".to_string();
        }
        // this server always speaks SSE
        self.card.capabilities.streaming = true;

        A2AServer {
            card: Arc::new(self.card),
            manager: self.manager,
        }
    }
}
