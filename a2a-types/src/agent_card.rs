use serde::{Deserialize, Serialize};

// ============================================================================
// A2A Agent Card and Discovery Types
// ============================================================================

/// Defines optional capabilities supported by an agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AgentCapabilities {
    /// Indicates if the agent supports Server-Sent Events (SSE) for streaming responses.
    #[serde(default)]
    pub streaming: bool,
    /// Indicates if the agent supports sending push notifications for asynchronous task updates.
    #[serde(default, rename = "pushNotifications")]
    pub push_notifications: bool,
    /// Indicates if the agent provides a history of state transitions for a task.
    #[serde(default, rename = "stateTransitionHistory")]
    pub state_transition_history: bool,
}

/// Represents the service provider of an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentProvider {
    /// The name of the agent provider's organization.
    pub organization: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Authentication requirements for talking to an agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentAuthentication {
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Represents a distinct capability or function that an agent can perform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSkill {
    /// A unique identifier for the agent's skill.
    pub id: String,
    /// A human-readable name for the skill.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Example prompts or scenarios that this skill can handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
    /// Supported input MIME types for this skill, overriding the agent's defaults.
    #[serde(skip_serializing_if = "Option::is_none", rename = "inputModes")]
    pub input_modes: Option<Vec<String>>,
    /// Supported output MIME types for this skill, overriding the agent's defaults.
    #[serde(skip_serializing_if = "Option::is_none", rename = "outputModes")]
    pub output_modes: Option<Vec<String>>,
}

fn default_modes() -> Vec<String> {
    vec!["text".to_string()]
}

/// The AgentCard is a self-describing manifest for an agent: who it is, where
/// it listens, and what it can do. Served at `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentCard {
    /// A human-readable name for the agent.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The base URL where the agent's JSON-RPC endpoint is hosted.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<AgentProvider>,
    /// The agent's own version string, set by the implementer.
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none", rename = "documentationUrl")]
    pub documentation_url: Option<String>,
    pub capabilities: AgentCapabilities,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AgentAuthentication>,
    #[serde(default = "default_modes", rename = "defaultInputModes")]
    pub default_input_modes: Vec<String>,
    #[serde(default = "default_modes", rename = "defaultOutputModes")]
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// Minimal card with text-only defaults and no declared skills.
    pub fn new(name: impl Into<String>, url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            url: url.into(),
            provider: None,
            version: version.into(),
            documentation_url: None,
            capabilities: AgentCapabilities::default(),
            authentication: None,
            default_input_modes: default_modes(),
            default_output_modes: default_modes(),
            skills: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_round_trips_with_defaults() {
        let card = AgentCard::new("Echo", "http://localhost:10000", "0.1.0");
        let encoded = serde_json::to_value(&card).unwrap();
        assert_eq!(encoded["defaultInputModes"], serde_json::json!(["text"]));
        assert!(encoded.get("description").is_none());

        let decoded: AgentCard = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, card);
    }

    #[test]
    fn missing_modes_fall_back_to_text() {
        let card: AgentCard = serde_json::from_value(serde_json::json!({
            "name": "Echo",
            "url": "http://localhost:10000",
            "version": "0.1.0",
            "capabilities": {"streaming": true},
            "skills": []
        }))
        .unwrap();
        assert!(card.capabilities.streaming);
        assert_eq!(card.default_output_modes, vec!["text".to_string()]);
    }
}
