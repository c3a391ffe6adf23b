//! Remote tool provider descriptors
//!
//! A provider is an external process exposing callable tools over a remote
//! transport. [`ProviderConfig`] says how to reach it; [`ProviderHealth`] is
//! the snapshot reported by the connection manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire transport used to talk to a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Bidirectional streaming: every message is POSTed, responses come back
    /// as JSON or as an event stream on the same request.
    #[default]
    StreamableHttp,
    /// One-way event stream: a long-lived GET carries responses, requests are
    /// POSTed to an endpoint announced on that stream.
    Sse,
}

impl TransportKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransportKind::StreamableHttp => "streamable_http",
            TransportKind::Sse => "sse",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "streamable_http" | "streamable-http" | "http" => Ok(TransportKind::StreamableHttp),
            "sse" => Ok(TransportKind::Sse),
            other => Err(format!("unknown transport: {}", other)),
        }
    }
}

/// How to reach one remote provider
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name, also the flat-name prefix of its tools
    pub name: String,
    /// Endpoint URL
    pub url: String,
    #[serde(default)]
    pub transport: TransportKind,
    /// Optional bearer credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Extra static headers sent with every request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport: TransportKind::default(),
            token: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// Keep the credential out of logs.
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("transport", &self.transport)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Health snapshot of one connected provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub name: String,
    pub transport: TransportKind,
    pub healthy: bool,
    /// Time of the last probe (or of the connect handshake)
    pub last_probe: Option<DateTime<Utc>>,
    pub tool_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_parse() {
        assert_eq!("sse".parse::<TransportKind>(), Ok(TransportKind::Sse));
        assert_eq!(
            "streamable-http".parse::<TransportKind>(),
            Ok(TransportKind::StreamableHttp)
        );
        assert!("websocket".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "name": "memory",
            "url": "http://localhost:9000/mcp"
        }))
        .unwrap();
        assert_eq!(config.transport, TransportKind::StreamableHttp);
        assert!(config.token.is_none());
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_debug_hides_token() {
        let config = ProviderConfig::new("memory", "http://x").with_token("secret-value");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("***"));
    }
}
