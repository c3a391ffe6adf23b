//! Streamable HTTP transport
//!
//! Every JSON-RPC message is POSTed to the provider URL. The reply comes back
//! on the same request, as plain JSON or as an event stream. A session id
//! handed out by the provider is echoed on every later request.

use super::event_stream::EventStreamDecoder;
use super::{McpTransport, SESSION_HEADER, into_result, provider_headers};
use crate::remote::error::{RemoteError, Result};
use crate::remote::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, MessageKind, classify_message,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use toolmesh_domain::ProviderConfig;
use tracing::{debug, trace};

pub struct StreamableHttpTransport {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    session_id: RwLock<Option<String>>,
}

impl StreamableHttpTransport {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client,
            url: config.url.clone(),
            headers: provider_headers(config)?,
            session_id: RwLock::new(None),
        })
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        let sent_session = self.session_id.read().await.clone();
        if let Some(session) = sent_session.as_deref() {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request.send().await?;

        // The provider forgot our session; it must be initialized again.
        if response.status() == StatusCode::NOT_FOUND
            && let Some(session) = sent_session
        {
            self.session_id.write().await.take();
            debug!(url = %self.url, "Provider rejected session");
            return Err(RemoteError::SessionExpired(session));
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut current = self.session_id.write().await;
            if current.as_deref() != Some(session) {
                debug!(url = %self.url, "Provider assigned session");
                *current = Some(session.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read an event-stream body until the reply to `id` shows up.
    async fn read_stream(response: reqwest::Response, id: u64) -> Result<JsonRpcResponse> {
        let mut decoder = EventStreamDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for event in decoder.feed(&chunk) {
                if let Some(reply) = Self::match_reply(&event.data, id)? {
                    return Ok(reply);
                }
            }
        }
        if let Some(event) = decoder.finish()
            && let Some(reply) = Self::match_reply(&event.data, id)?
        {
            return Ok(reply);
        }

        Err(RemoteError::Protocol(format!(
            "event stream ended without a reply to request {}",
            id
        )))
    }

    fn match_reply(data: &str, id: u64) -> Result<Option<JsonRpcResponse>> {
        let json: Value = match serde_json::from_str(data) {
            Ok(json) => json,
            Err(_) => {
                trace!(data, "Skipping non-JSON event");
                return Ok(None);
            }
        };
        match classify_message(&json) {
            MessageKind::Response { id: reply_id } if reply_id == id => {
                Ok(Some(serde_json::from_value(json)?))
            }
            kind => {
                trace!(?kind, "Ignoring unrelated message on request stream");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl McpTransport for StreamableHttpTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let request = JsonRpcRequest::new(method, params);
        let id = request.id;
        trace!(id, method, url = %self.url, "Sending request");

        let response = self.post(&request).await?;

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/event-stream"));

        let reply = if is_stream {
            Self::read_stream(response, id).await?
        } else {
            response.json::<JsonRpcResponse>().await?
        };
        into_result(reply)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcNotification::new(method, params);
        // Providers answer 202 Accepted with no body.
        self.post(&notification).await.map(|_| ())
    }

    async fn close(&self) {
        let Some(session) = self.session_id.write().await.take() else {
            return;
        };
        let result = self
            .client
            .delete(&self.url)
            .headers(self.headers.clone())
            .header(SESSION_HEADER, &session)
            .send()
            .await;
        if let Err(e) = result {
            debug!(url = %self.url, error = %e, "Session teardown failed");
        }
    }
}
