//! Wire transports for remote providers
//!
//! Both transports speak JSON-RPC; they differ in how responses travel back:
//!
//! - [`StreamableHttpTransport`]: each request is a POST whose response body
//!   is either plain JSON or an event stream carrying the reply.
//! - [`SseTransport`]: a long-lived GET stream carries every reply, and
//!   requests are POSTed to the endpoint the stream announces.

pub mod event_stream;
pub mod sse;
pub mod streamable;

pub use event_stream::{EventStreamDecoder, ServerEvent};
pub use sse::SseTransport;
pub use streamable::StreamableHttpTransport;

use super::error::{RemoteError, Result};
use super::protocol::JsonRpcResponse;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::Arc;
use toolmesh_domain::{ProviderConfig, TransportKind};

/// Header carrying the provider-assigned session id
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

/// One open connection to a provider
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and wait for its `result`.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value>;

    /// Send a notification; no reply is expected.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()>;

    /// Release the connection. Best-effort; never fails.
    async fn close(&self);
}

/// Opens transports for provider configs
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(&self, config: &ProviderConfig) -> Result<Arc<dyn McpTransport>>;
}

/// Production factory backed by one shared `reqwest::Client`
#[derive(Debug, Clone, Default)]
pub struct HttpTransportFactory {
    client: reqwest::Client,
}

impl HttpTransportFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TransportFactory for HttpTransportFactory {
    async fn open(&self, config: &ProviderConfig) -> Result<Arc<dyn McpTransport>> {
        match config.transport {
            TransportKind::StreamableHttp => Ok(Arc::new(StreamableHttpTransport::new(
                self.client.clone(),
                config,
            )?)),
            TransportKind::Sse => Ok(Arc::new(
                SseTransport::connect(self.client.clone(), config).await?,
            )),
        }
    }
}

/// Static headers for a provider: bearer credential plus configured extras.
pub(crate) fn provider_headers(config: &ProviderConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &config.token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| RemoteError::Protocol("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, value);
    }
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RemoteError::Protocol(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RemoteError::Protocol(format!("invalid value for '{}': {}", name, e)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

/// Unwrap a JSON-RPC response into its `result`.
pub(crate) fn into_result(response: JsonRpcResponse) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(RemoteError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_headers() {
        let config = ProviderConfig::new("gh", "http://localhost")
            .with_token("abc")
            .with_header("X-Team", "core");
        let headers = provider_headers(&config).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc");
        assert_eq!(headers["x-team"], "core");

        let bad = ProviderConfig::new("gh", "http://localhost").with_header("bad header", "x");
        assert!(provider_headers(&bad).is_err());
    }

    #[test]
    fn test_into_result() {
        let ok: JsonRpcResponse =
            serde_json::from_value(serde_json::json!({"id": 1, "result": {"a": 1}})).unwrap();
        assert_eq!(into_result(ok).unwrap()["a"], 1);

        let err: JsonRpcResponse = serde_json::from_value(serde_json::json!({
            "id": 1,
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap();
        assert!(matches!(
            into_result(err),
            Err(RemoteError::Rpc { code: -32601, .. })
        ));
    }
}
