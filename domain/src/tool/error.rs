//! Tool dispatch error taxonomy
//!
//! Every failure on the path from a flat tool name to a result is expressed as
//! a [`ToolError`]. The variants split into two groups that drive the
//! protocol executor's retry policy:
//!
//! | Variant | Retryable? | Meaning |
//! |---------|-----------|---------|
//! | `UnknownTool` | No | Name resolves to nothing anywhere |
//! | `AccessDenied` | No | Name exists, caller lacks the grant |
//! | `AgentNotFound` | No | Caller (or delegate) is not registered |
//! | `InvalidArguments` | No | Arguments cannot be interpreted |
//! | `DelegationCycle` | No | Delegation chain re-entered an agent or ran too deep |
//! | `ProviderUnhealthy` | Yes | Owning provider failed its last probe |
//! | `ProviderError` | Yes | Remote call ran and failed |
//! | `FunctionFailed` | Yes | Local handler returned an error |
//! | `Timeout` | Yes | Call exceeded its deadline |

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ToolError {
    #[error("Unknown tool: {tool}")]
    UnknownTool { tool: String },

    #[error("Agent '{agent}' is not granted tool '{tool}'")]
    AccessDenied { agent: String, tool: String },

    #[error("Agent not found: {agent}")]
    AgentNotFound { agent: String },

    #[error("Provider '{provider}' is unhealthy")]
    ProviderUnhealthy { provider: String },

    #[error("Provider '{provider}' returned an error: {message}")]
    ProviderError { provider: String, message: String },

    #[error("Invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Delegation cycle: {}", chain.join(" -> "))]
    DelegationCycle { chain: Vec<String> },

    #[error("Function '{function}' failed: {message}")]
    FunctionFailed { function: String, message: String },

    #[error("Tool '{tool}' timed out after {timeout_ms}ms")]
    Timeout { tool: String, timeout_ms: u64 },
}

impl ToolError {
    pub fn unknown_tool(tool: impl Into<String>) -> Self {
        ToolError::UnknownTool { tool: tool.into() }
    }

    pub fn access_denied(agent: impl Into<String>, tool: impl Into<String>) -> Self {
        ToolError::AccessDenied {
            agent: agent.into(),
            tool: tool.into(),
        }
    }

    pub fn agent_not_found(agent: impl Into<String>) -> Self {
        ToolError::AgentNotFound {
            agent: agent.into(),
        }
    }

    pub fn provider_unhealthy(provider: impl Into<String>) -> Self {
        ToolError::ProviderUnhealthy {
            provider: provider.into(),
        }
    }

    pub fn provider_error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::ProviderError {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn invalid_arguments(tool: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::InvalidArguments {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn function_failed(function: impl Into<String>, message: impl Into<String>) -> Self {
        ToolError::FunctionFailed {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable code, matching the serialized `code` tag.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::UnknownTool { .. } => "unknown_tool",
            ToolError::AccessDenied { .. } => "access_denied",
            ToolError::AgentNotFound { .. } => "agent_not_found",
            ToolError::ProviderUnhealthy { .. } => "provider_unhealthy",
            ToolError::ProviderError { .. } => "provider_error",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::DelegationCycle { .. } => "delegation_cycle",
            ToolError::FunctionFailed { .. } => "function_failed",
            ToolError::Timeout { .. } => "timeout",
        }
    }

    /// Whether a retry policy may re-attempt the call.
    ///
    /// Resolution and grant failures are deterministic and never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolError::ProviderUnhealthy { .. }
                | ToolError::ProviderError { .. }
                | ToolError::FunctionFailed { .. }
                | ToolError::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(!ToolError::unknown_tool("x").is_retryable());
        assert!(!ToolError::access_denied("a", "x").is_retryable());
        assert!(!ToolError::agent_not_found("a").is_retryable());
        assert!(!ToolError::invalid_arguments("x", "bad").is_retryable());
        assert!(
            !ToolError::DelegationCycle {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }
            .is_retryable()
        );

        assert!(ToolError::provider_unhealthy("p").is_retryable());
        assert!(ToolError::provider_error("p", "boom").is_retryable());
        assert!(ToolError::function_failed("f", "boom").is_retryable());
        assert!(
            ToolError::Timeout {
                tool: "p_x".into(),
                timeout_ms: 10
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_access_denied_distinct_from_unknown() {
        let denied = ToolError::access_denied("writer", "github_search");
        let unknown = ToolError::unknown_tool("github_search");
        assert_ne!(denied.code(), unknown.code());
        assert_eq!(
            denied.to_string(),
            "Agent 'writer' is not granted tool 'github_search'"
        );
    }

    #[test]
    fn test_cycle_display() {
        let err = ToolError::DelegationCycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Delegation cycle: a -> b -> a");
    }

    #[test]
    fn test_serialized_code_matches() {
        let err = ToolError::provider_error("memory", "500");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], err.code());
    }
}
