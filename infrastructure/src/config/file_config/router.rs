//! Router configuration from TOML (`[router]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolmesh_application::RouterParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRouterConfig {
    /// Longest delegation chain before a call is refused
    pub max_delegation_depth: usize,
    /// Default bound on a single tool call
    pub default_tool_timeout_secs: u64,
}

impl Default for FileRouterConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: 8,
            default_tool_timeout_secs: 300,
        }
    }
}

impl FileRouterConfig {
    pub fn to_router_params(&self) -> RouterParams {
        RouterParams::default()
            .with_max_delegation_depth(self.max_delegation_depth)
            .with_tool_timeout(Duration::from_secs(self.default_tool_timeout_secs))
    }
}
