//! JSON-RPC and MCP message types for remote tool providers.
//!
//! # Protocol Overview
//!
//! - **Handshake**: `initialize` request, then the `notifications/initialized` notification
//! - **Discovery**: `tools/list` (paginated by `nextCursor`)
//! - **Invocation**: `tools/call` with `{name, arguments}`
//! - **Liveness**: `ping`

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use toolmesh_domain::ToolDescriptor;

/// Protocol revision sent in the `initialize` request.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Global request ID counter for JSON-RPC requests.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new JSON-RPC request with an auto-generated ID.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: next_id(),
            method: method.into(),
            params,
        }
    }
}

/// Outgoing JSON-RPC notification (no id, no response)
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

/// Classification of an incoming JSON-RPC message.
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A response to a request we sent (has `id`, no `method`).
    Response { id: u64 },
    /// A server-initiated request (has `id` + `method`), e.g. `ping` or `roots/list`.
    IncomingRequest { id: u64 },
    /// A notification (has `method`, no `id`), e.g. `notifications/tools/list_changed`.
    Notification,
}

/// Classify a JSON-RPC message by inspecting its `id` and `method` fields.
pub fn classify_message(json: &Value) -> MessageKind {
    let id = json.get("id").and_then(|v| v.as_u64());
    let method = json.get("method").and_then(|v| v.as_str());

    match (id, method) {
        (Some(id), Some(_)) => MessageKind::IncomingRequest { id },
        (Some(id), None) => MessageKind::Response { id },
        _ => MessageKind::Notification,
    }
}

/// Parameters of the `initialize` request.
pub fn initialize_params() -> Value {
    serde_json::json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}

/// A tool as advertised by a provider's `tools/list`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpTool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl McpTool {
    /// Catalog entry renamed to the flat `provider_name` form.
    pub fn to_descriptor(&self, provider: &str) -> ToolDescriptor {
        ToolDescriptor::new(&self.name, self.description.clone().unwrap_or_default())
            .with_schema(self.input_schema.clone())
            .prefixed(provider)
    }
}

/// Result of `tools/list`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpTool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One block of a `tools/call` result
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        #[serde(default)]
        data: String,
        #[serde(default, rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: Value,
    },
    #[serde(other)]
    Unknown,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Text blocks joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Convert into the value handed back to callers.
    ///
    /// `structuredContent` wins; a lone text block holding JSON becomes that
    /// JSON; otherwise the joined text. `isError` yields the text as `Err`.
    pub fn into_value(self) -> Result<Value, String> {
        if self.is_error {
            let text = self.text();
            return Err(if text.is_empty() {
                "tool reported an error".to_string()
            } else {
                text
            });
        }

        if let Some(structured) = self.structured_content {
            return Ok(structured);
        }

        if let [ContentBlock::Text { text }] = self.content.as_slice()
            && let Ok(parsed) = serde_json::from_str::<Value>(text)
        {
            return Ok(parsed);
        }

        Ok(Value::String(self.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(value: Value) -> CallToolResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn classify_response() {
        let json = json!({"jsonrpc": "2.0", "id": 7, "result": {}});
        assert_eq!(classify_message(&json), MessageKind::Response { id: 7 });
    }

    #[test]
    fn classify_incoming_request() {
        let json = json!({"id": 3, "method": "ping"});
        assert_eq!(classify_message(&json), MessageKind::IncomingRequest { id: 3 });
    }

    #[test]
    fn classify_notification() {
        let json = json!({"method": "notifications/tools/list_changed"});
        assert_eq!(classify_message(&json), MessageKind::Notification);
    }

    #[test]
    fn request_ids_increase() {
        let a = JsonRpcRequest::new("ping", None);
        let b = JsonRpcRequest::new("ping", None);
        assert!(b.id > a.id);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert!(json.get("params").is_none());
    }

    #[test]
    fn tool_descriptor_is_prefixed() {
        let tool: McpTool = serde_json::from_value(json!({
            "name": "search_issues",
            "description": null,
            "inputSchema": {"type": "object", "required": ["q"]}
        }))
        .unwrap();
        let descriptor = tool.to_descriptor("github");
        assert_eq!(descriptor.name, "github_search_issues");
        assert_eq!(descriptor.description, "");
        assert_eq!(descriptor.input_schema["required"], json!(["q"]));
    }

    #[test]
    fn structured_content_wins() {
        let r = result(json!({
            "content": [{"type": "text", "text": "{\"ignored\": true}"}],
            "structuredContent": {"id": 42}
        }));
        assert_eq!(r.into_value(), Ok(json!({"id": 42})));
    }

    #[test]
    fn single_json_text_block_is_parsed() {
        let r = result(json!({"content": [{"type": "text", "text": "{\"id\": 42}"}]}));
        assert_eq!(r.into_value(), Ok(json!({"id": 42})));
    }

    #[test]
    fn plain_text_blocks_are_joined() {
        let r = result(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "text", "text": "second"}
            ]
        }));
        assert_eq!(r.into_value(), Ok(json!("first\nsecond")));

        let r = result(json!({"content": [{"type": "text", "text": "not json"}]}));
        assert_eq!(r.into_value(), Ok(json!("not json")));
    }

    #[test]
    fn error_result_carries_text() {
        let r = result(json!({
            "content": [{"type": "text", "text": "rate limited"}],
            "isError": true
        }));
        assert_eq!(r.into_value(), Err("rate limited".to_string()));
    }

    #[test]
    fn unknown_block_types_are_tolerated() {
        let r = result(json!({"content": [{"type": "audio", "data": "..."}]}));
        assert_eq!(r.into_value(), Ok(json!("")));
    }
}
