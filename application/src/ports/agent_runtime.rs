//! Agent runtime port
//!
//! Receives delegations whose input is not a direct tool call, e.g. a
//! free-form task handed to another agent's reasoning loop.

use async_trait::async_trait;
use serde_json::Value;
use toolmesh_domain::ToolError;

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn invoke(&self, agent: &str, input: Value) -> Result<Value, ToolError>;
}
