//! Server-sent-events transport
//!
//! A long-lived GET stream carries every message from the provider. The first
//! `endpoint` event names the URL that requests are POSTed to; replies arrive
//! later on the stream and are matched to their caller by JSON-RPC id.
//!
//! A background reader task owns the stream exclusively. Each in-flight
//! request parks a `oneshot` sender in the pending map; when the stream ends
//! the map is cleared so every waiter observes [`RemoteError::TransportClosed`].

use super::event_stream::{EventStreamDecoder, ServerEvent};
use super::{McpTransport, into_result, provider_headers};
use crate::remote::error::{RemoteError, Result};
use crate::remote::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, MessageKind, classify_message,
};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Url;
use reqwest::header::{ACCEPT, HeaderMap};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use toolmesh_domain::ProviderConfig;
use tracing::{debug, info, trace, warn};

/// How long to wait for the stream to announce its endpoint.
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

type PendingMap = Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type ByteStream = BoxStream<'static, reqwest::Result<Vec<u8>>>;

pub struct SseTransport {
    client: reqwest::Client,
    headers: HeaderMap,
    endpoint: Url,
    pending: PendingMap,
    cancel: CancellationToken,
}

impl SseTransport {
    /// Open the event stream and wait for the endpoint announcement.
    pub async fn connect(client: reqwest::Client, config: &ProviderConfig) -> Result<Self> {
        let headers = provider_headers(config)?;
        let base = Url::parse(&config.url)
            .map_err(|e| RemoteError::Protocol(format!("invalid url '{}': {}", config.url, e)))?;

        let response = client
            .get(base.clone())
            .headers(headers.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream: ByteStream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        let mut decoder = EventStreamDecoder::new();

        let (endpoint, backlog) = tokio::time::timeout(
            ENDPOINT_TIMEOUT,
            Self::await_endpoint(&mut stream, &mut decoder),
        )
        .await
        .map_err(|_| RemoteError::timeout("endpoint announcement", ENDPOINT_TIMEOUT))??;

        let endpoint = base.join(&endpoint).map_err(|e| {
            RemoteError::Protocol(format!("invalid endpoint '{}': {}", endpoint, e))
        })?;
        debug!(provider = %config.name, %endpoint, "Event stream open");

        let transport = Self {
            client,
            headers,
            endpoint,
            pending: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
        };

        let reader = ReaderContext {
            client: transport.client.clone(),
            headers: transport.headers.clone(),
            endpoint: transport.endpoint.clone(),
            pending: Arc::clone(&transport.pending),
            cancel: transport.cancel.clone(),
        };
        tokio::spawn(reader.run(stream, decoder, backlog));

        Ok(transport)
    }

    /// Read until the `endpoint` event, keeping any events that followed it.
    async fn await_endpoint(
        stream: &mut ByteStream,
        decoder: &mut EventStreamDecoder,
    ) -> Result<(String, Vec<ServerEvent>)> {
        while let Some(chunk) = stream.next().await {
            let mut events = decoder.feed(&chunk?).into_iter();
            if let Some(found) = events.by_ref().find(|e| e.event == "endpoint") {
                return Ok((found.data.trim().to_string(), events.collect()));
            }
        }
        Err(RemoteError::Protocol(
            "event stream closed before announcing an endpoint".into(),
        ))
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<()> {
        post_json(&self.client, &self.endpoint, &self.headers, body).await
    }
}

#[async_trait]
impl McpTransport for SseTransport {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.cancel.is_cancelled() {
            return Err(RemoteError::TransportClosed);
        }

        let request = JsonRpcRequest::new(method, params);
        let (tx, rx) = oneshot::channel();
        self.pending
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(request.id, tx);
        // Removes the entry on every exit path, including caller timeouts.
        let _guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            id: request.id,
        };

        trace!(id = request.id, method, endpoint = %self.endpoint, "Sending request");
        self.post(&request).await?;

        let reply = rx.await.map_err(|_| RemoteError::TransportClosed)?;
        into_result(reply)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RemoteError::TransportClosed);
        }
        self.post(&JsonRpcNotification::new(method, params)).await
    }

    async fn close(&self) {
        self.cancel.cancel();
        self.pending
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct PendingGuard {
    pending: PendingMap,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

async fn post_json<T: Serialize>(
    client: &reqwest::Client,
    endpoint: &Url,
    headers: &HeaderMap,
    body: &T,
) -> Result<()> {
    let response = client
        .post(endpoint.clone())
        .headers(headers.clone())
        .json(body)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

/// Everything the background reader needs, detached from the transport.
struct ReaderContext {
    client: reqwest::Client,
    headers: HeaderMap,
    endpoint: Url,
    pending: PendingMap,
    cancel: CancellationToken,
}

impl ReaderContext {
    async fn run(
        self,
        mut stream: ByteStream,
        mut decoder: EventStreamDecoder,
        backlog: Vec<ServerEvent>,
    ) {
        for event in backlog {
            self.handle_event(event).await;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(endpoint = %self.endpoint, "Reader cancelled");
                    break;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for event in decoder.feed(&bytes) {
                            self.handle_event(event).await;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(endpoint = %self.endpoint, "Event stream failed: {}", RemoteError::from(e));
                        break;
                    }
                    None => {
                        info!(endpoint = %self.endpoint, "Event stream closed by provider");
                        break;
                    }
                }
            }
        }

        // Waiters observe a dropped sender.
        self.cancel.cancel();
        self.pending
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    async fn handle_event(&self, event: ServerEvent) {
        if event.event != "message" {
            trace!(event = %event.event, "Ignoring event");
            return;
        }
        let json: Value = match serde_json::from_str(&event.data) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to parse event data: {}: {}", e, event.data);
                return;
            }
        };

        if let Some((id, method)) = route_message(json, &self.pending) {
            self.answer_server_request(id, &method).await;
        }
    }

    /// Providers may ping us; anything else is refused.
    async fn answer_server_request(&self, id: u64, method: &str) {
        let reply = if method == "ping" {
            serde_json::json!({"jsonrpc": "2.0", "id": id, "result": {}})
        } else {
            debug!(method, "Refusing server request");
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": -32601, "message": format!("Method not found: {}", method)}
            })
        };
        if let Err(e) = post_json(&self.client, &self.endpoint, &self.headers, &reply).await {
            debug!(method, error = %e, "Failed to answer server request");
        }
    }
}

/// Deliver a response to its waiter. Returns `(id, method)` for server requests.
fn route_message(json: Value, pending: &PendingMap) -> Option<(u64, String)> {
    match classify_message(&json) {
        MessageKind::Response { id } => {
            let response: JsonRpcResponse = match serde_json::from_value(json) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Failed to parse response: {}", e);
                    return None;
                }
            };
            let sender = pending
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&id);
            match sender {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => debug!(id, "No pending receiver for response"),
            }
            None
        }
        MessageKind::IncomingRequest { id } => {
            let method = json.get("method").and_then(|m| m.as_str()).unwrap_or_default();
            Some((id, method.to_string()))
        }
        MessageKind::Notification => {
            trace!("Ignoring notification: {}", json);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingMap {
        Arc::new(RwLock::new(HashMap::new()))
    }

    #[tokio::test]
    async fn test_response_reaches_waiter() {
        let pending = pending();
        let (tx, rx) = oneshot::channel();
        pending.write().unwrap().insert(11, tx);

        let routed = route_message(
            serde_json::json!({"jsonrpc": "2.0", "id": 11, "result": {"tools": []}}),
            &pending,
        );
        assert!(routed.is_none());
        assert!(pending.read().unwrap().is_empty());

        let reply = rx.await.unwrap();
        assert_eq!(reply.id, Some(11));
        assert!(reply.result.is_some());
    }

    #[test]
    fn test_server_request_is_returned() {
        let pending = pending();
        let routed = route_message(serde_json::json!({"id": 3, "method": "ping"}), &pending);
        assert_eq!(routed, Some((3, "ping".to_string())));

        let routed = route_message(
            serde_json::json!({"method": "notifications/message", "params": {}}),
            &pending,
        );
        assert!(routed.is_none());
    }

    #[tokio::test]
    async fn test_guard_removes_abandoned_entry() {
        let pending = pending();
        let (tx, rx) = oneshot::channel::<JsonRpcResponse>();
        pending.write().unwrap().insert(5, tx);
        {
            let _guard = PendingGuard {
                pending: Arc::clone(&pending),
                id: 5,
            };
        }
        assert!(pending.read().unwrap().is_empty());
        assert!(rx.await.is_err());
    }
}
