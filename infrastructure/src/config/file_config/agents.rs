//! Agent grants from TOML (`[[agents]]` tables)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolmesh_domain::AgentCapabilities;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub name: String,
    /// Built-in functions this agent may call
    pub local_functions: Vec<String>,
    /// Agents this agent may delegate to
    pub delegates: Vec<String>,
    /// Providers granted in full
    pub mcp_servers: Vec<String>,
    /// Narrow grants: provider → tool names
    pub mcp_tools: BTreeMap<String, Vec<String>>,
}

impl FileAgentConfig {
    pub fn to_capabilities(&self) -> AgentCapabilities {
        let mut agent = AgentCapabilities::new(&self.name);
        for function in &self.local_functions {
            agent = agent.with_local_function(function);
        }
        for delegate in &self.delegates {
            agent = agent.with_delegate(delegate);
        }
        for provider in &self.mcp_servers {
            agent = agent.with_provider(provider);
        }
        for (provider, tools) in &self.mcp_tools {
            agent = agent.with_provider_tools(provider, tools);
        }
        agent
    }

    /// Every provider this agent references, full or narrow.
    pub fn referenced_providers(&self) -> impl Iterator<Item = &str> {
        self.mcp_servers
            .iter()
            .map(String::as_str)
            .chain(self.mcp_tools.keys().map(String::as_str))
    }
}
