//! Remote tool gateway port
//!
//! Defines how the router reaches tools hosted by remote providers. The
//! connection manager in the infrastructure layer is the production adapter.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use toolmesh_domain::{RemoteGrants, ToolDescriptor, ToolError};

/// Port for calling remote provider tools by flat name
#[async_trait]
pub trait RemoteToolGateway: Send + Sync {
    /// Call `flat_name` (`provider_tool`) with `arguments`, bounded by `timeout`.
    async fn call_tool(
        &self,
        flat_name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value, ToolError>;

    /// Whether a connected provider currently exposes `flat_name`.
    async fn owns_tool(&self, flat_name: &str) -> bool;

    /// Catalog entries visible under `grants`, in flat-name form.
    async fn tool_descriptors_for(&self, grants: &RemoteGrants) -> Vec<ToolDescriptor>;
}

/// Gateway with no providers, for deployments without remote tools.
pub struct NoRemoteTools;

#[async_trait]
impl RemoteToolGateway for NoRemoteTools {
    async fn call_tool(
        &self,
        flat_name: &str,
        _arguments: Value,
        _timeout: Duration,
    ) -> Result<Value, ToolError> {
        Err(ToolError::unknown_tool(flat_name))
    }

    async fn owns_tool(&self, _flat_name: &str) -> bool {
        false
    }

    async fn tool_descriptors_for(&self, _grants: &RemoteGrants) -> Vec<ToolDescriptor> {
        Vec::new()
    }
}
