//! Tool domain entities

use serde::{Deserialize, Serialize};

/// Prefix that marks a flat tool name as a delegation to another agent.
pub const DELEGATION_PREFIX: &str = "delegate_to_";

/// Separator between a provider name and the provider's own tool name.
pub const PROVIDER_SEPARATOR: char = '_';

/// Build the flat name of a remote tool (`provider_tool`).
pub fn flat_tool_name(provider: &str, original: &str) -> String {
    format!("{}{}{}", provider, PROVIDER_SEPARATOR, original)
}

/// Build the flat name used to delegate to `agent`.
pub fn delegation_tool_name(agent: &str) -> String {
    format!("{}{}", DELEGATION_PREFIX, agent)
}

/// Extract the target agent from a delegation name, if it follows the convention.
///
/// A bare `delegate_to_` with no agent is not a delegation.
pub fn delegation_target(tool_name: &str) -> Option<&str> {
    tool_name
        .strip_prefix(DELEGATION_PREFIX)
        .filter(|target| !target.is_empty())
}

/// Strip `provider_` from a flat name, returning the provider's original tool name.
pub fn strip_provider_prefix<'a>(provider: &str, flat_name: &'a str) -> Option<&'a str> {
    flat_name
        .strip_prefix(provider)
        .and_then(|rest| rest.strip_prefix(PROVIDER_SEPARATOR))
        .filter(|original| !original.is_empty())
}

/// How a flat tool name was resolved for a particular agent.
///
/// Resolved fresh on every call and never cached beyond a single dispatch.
/// Adding a fourth kind means extending this enum and every `match` on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolReference {
    /// An in-process function registered with the router
    LocalFunction { name: String },
    /// A request forwarded to another agent
    Delegation { target_agent: String },
    /// A tool exposed by a remote provider
    RemoteTool {
        provider: String,
        original_name: String,
    },
}

impl ToolReference {
    pub fn local(name: impl Into<String>) -> Self {
        ToolReference::LocalFunction { name: name.into() }
    }

    pub fn delegation(target_agent: impl Into<String>) -> Self {
        ToolReference::Delegation {
            target_agent: target_agent.into(),
        }
    }

    pub fn remote(provider: impl Into<String>, original_name: impl Into<String>) -> Self {
        ToolReference::RemoteTool {
            provider: provider.into(),
            original_name: original_name.into(),
        }
    }

    /// The flat name a caller would use to reach this reference.
    pub fn flat_name(&self) -> String {
        match self {
            ToolReference::LocalFunction { name } => name.clone(),
            ToolReference::Delegation { target_agent } => delegation_tool_name(target_agent),
            ToolReference::RemoteTool {
                provider,
                original_name,
            } => flat_tool_name(provider, original_name),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolReference::LocalFunction { .. } => "local_function",
            ToolReference::Delegation { .. } => "delegation",
            ToolReference::RemoteTool { .. } => "remote_tool",
        }
    }
}

impl std::fmt::Display for ToolReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolReference::LocalFunction { name } => write!(f, "local:{}", name),
            ToolReference::Delegation { target_agent } => write!(f, "delegate:{}", target_agent),
            ToolReference::RemoteTool {
                provider,
                original_name,
            } => write!(f, "remote:{}/{}", provider, original_name),
        }
    }
}

/// Catalog entry for a callable tool: flat name, description and JSON Schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_object_schema", alias = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
        }
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Copy of this descriptor renamed to its flat `provider_name` form.
    pub fn prefixed(&self, provider: &str) -> Self {
        Self {
            name: flat_tool_name(provider, &self.name),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Synthetic catalog entry for `delegate_to_<agent>`.
    pub fn delegation(agent: &str) -> Self {
        Self::new(
            delegation_tool_name(agent),
            format!("Delegate a request to agent '{}'", agent),
        )
        .with_schema(serde_json::json!({
            "type": "object",
            "properties": {
                "tool": {
                    "type": "string",
                    "description": "Tool to invoke as the target agent"
                },
                "arguments": {
                    "type": "object",
                    "description": "Arguments forwarded to the tool"
                },
                "input": {
                    "description": "Free-form input handed to the agent runtime"
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_names() {
        assert_eq!(flat_tool_name("github", "search_issues"), "github_search_issues");
        assert_eq!(delegation_tool_name("researcher"), "delegate_to_researcher");
    }

    #[test]
    fn test_delegation_target() {
        assert_eq!(delegation_target("delegate_to_researcher"), Some("researcher"));
        assert_eq!(delegation_target("delegate_to_"), None);
        assert_eq!(delegation_target("github_search"), None);
    }

    #[test]
    fn test_strip_provider_prefix() {
        assert_eq!(strip_provider_prefix("github", "github_search"), Some("search"));
        assert_eq!(strip_provider_prefix("github", "githubsearch"), None);
        assert_eq!(strip_provider_prefix("github", "github_"), None);
        assert_eq!(strip_provider_prefix("git", "github_search"), None);
    }

    #[test]
    fn test_reference_flat_name_round_trips_convention() {
        assert_eq!(ToolReference::local("echo").flat_name(), "echo");
        assert_eq!(
            ToolReference::delegation("writer").flat_name(),
            "delegate_to_writer"
        );
        assert_eq!(
            ToolReference::remote("memory", "store").flat_name(),
            "memory_store"
        );
    }

    #[test]
    fn test_reference_serializes_tagged() {
        let json = serde_json::to_value(ToolReference::remote("memory", "store")).unwrap();
        assert_eq!(json["kind"], "remote_tool");
        assert_eq!(json["provider"], "memory");
        assert_eq!(json["original_name"], "store");
    }

    #[test]
    fn test_descriptor_prefixed_keeps_schema() {
        let schema = serde_json::json!({"type": "object", "required": ["q"]});
        let tool = ToolDescriptor::new("search", "Search").with_schema(schema.clone());
        let flat = tool.prefixed("web");
        assert_eq!(flat.name, "web_search");
        assert_eq!(flat.input_schema, schema);
    }

    #[test]
    fn test_descriptor_accepts_mcp_field_name() {
        let tool: ToolDescriptor = serde_json::from_value(serde_json::json!({
            "name": "search",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(tool.input_schema["type"], "object");
        assert!(tool.description.is_empty());
    }
}
