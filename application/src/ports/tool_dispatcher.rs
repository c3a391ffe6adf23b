//! Tool dispatcher port
//!
//! The protocol executor calls tools through this seam; the router is the
//! production implementation.

use async_trait::async_trait;
use serde_json::Value;
use toolmesh_domain::ToolError;

/// Port for dispatching a flat tool name as a given agent
#[async_trait]
pub trait ToolDispatcher: Send + Sync {
    async fn dispatch(&self, agent: &str, tool: &str, arguments: Value) -> Result<Value, ToolError>;
}
