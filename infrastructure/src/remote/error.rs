//! Error types for remote provider connections

use thiserror::Error;
use toolmesh_domain::ToolError;

/// Result type alias for remote provider operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors that can occur when talking to remote tool providers
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc { code: i64, message: String },

    #[error("Tool '{tool}' on provider '{provider}' failed: {message}")]
    ToolFailed {
        provider: String,
        tool: String,
        message: String,
    },

    #[error("Provider already connected: {0}")]
    AlreadyConnected(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("No connected provider exposes tool: {0}")]
    ToolNotFound(String),

    #[error("Provider '{0}' is unhealthy")]
    ProviderUnhealthy(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Transport closed")]
    TransportClosed,

    #[error("Session expired: {0}")]
    SessionExpired(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest hides the useful part (DNS, refused, TLS) in the source chain.
        let mut message = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(cause) = source {
            message.push_str(" -> ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        RemoteError::Transport(message)
    }
}

impl RemoteError {
    pub fn timeout(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        RemoteError::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Map onto the dispatch taxonomy for a call to `tool` on `provider`.
    pub fn into_tool_error(self, provider: Option<&str>, tool: &str) -> ToolError {
        match self {
            RemoteError::ToolNotFound(_) | RemoteError::ProviderNotFound(_) => {
                ToolError::unknown_tool(tool)
            }
            RemoteError::ProviderUnhealthy(p) => ToolError::provider_unhealthy(p),
            RemoteError::Timeout { timeout_ms, .. } => ToolError::Timeout {
                tool: tool.to_string(),
                timeout_ms,
            },
            other => ToolError::provider_error(provider.unwrap_or(tool), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_mapping_to_tool_error() {
        assert_eq!(
            RemoteError::ToolNotFound("gh_x".into()).into_tool_error(None, "gh_x"),
            ToolError::unknown_tool("gh_x")
        );
        assert_eq!(
            RemoteError::ProviderUnhealthy("gh".into()).into_tool_error(Some("gh"), "gh_x"),
            ToolError::provider_unhealthy("gh")
        );
        assert_eq!(
            RemoteError::timeout("tools/call", Duration::from_millis(250))
                .into_tool_error(Some("gh"), "gh_x"),
            ToolError::Timeout {
                tool: "gh_x".into(),
                timeout_ms: 250
            }
        );

        let err = RemoteError::Rpc {
            code: -32602,
            message: "bad params".into(),
        }
        .into_tool_error(Some("gh"), "gh_x");
        assert!(err.is_retryable());
        assert!(matches!(err, ToolError::ProviderError { ref provider, .. } if provider == "gh"));
    }
}
