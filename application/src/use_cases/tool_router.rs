//! Tool Router use case
//!
//! Resolves a flat tool name into a [`ToolReference`] for a calling agent,
//! enforces the agent's grants, and dispatches the call.
//!
//! Resolution order is fixed:
//!
//! 1. `delegate_to_<agent>` with the target in the caller's delegate set
//! 2. a name inside the caller's remote grants (longest provider prefix wins)
//! 3. one of the caller's local functions
//! 4. otherwise `AccessDenied` when the name exists anywhere, else `UnknownTool`

use crate::config::RouterParams;
use crate::ports::agent_runtime::AgentRuntime;
use crate::ports::local_function::LocalFunctionRegistry;
use crate::ports::remote_gateway::RemoteToolGateway;
use crate::ports::tool_dispatcher::ToolDispatcher;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use toolmesh_domain::{
    AgentCapabilities, CapabilityRegistry, ToolDescriptor, ToolError, ToolReference,
    delegation_target, delegation_tool_name,
};
use tracing::{debug, trace, warn};

/// Routes tool calls from agents to local functions, delegates or remote providers
pub struct ToolRouter<G: RemoteToolGateway + 'static> {
    registry: Arc<RwLock<CapabilityRegistry>>,
    functions: LocalFunctionRegistry,
    remote: Arc<G>,
    runtime: Option<Arc<dyn AgentRuntime>>,
    params: RouterParams,
}

impl<G: RemoteToolGateway + 'static> ToolRouter<G> {
    pub fn new(registry: CapabilityRegistry, functions: LocalFunctionRegistry, remote: Arc<G>) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            functions,
            remote,
            runtime: None,
            params: RouterParams::default(),
        }
    }

    pub fn with_params(mut self, params: RouterParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_agent_runtime(mut self, runtime: Arc<dyn AgentRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn params(&self) -> &RouterParams {
        &self.params
    }

    pub fn functions(&self) -> &LocalFunctionRegistry {
        &self.functions
    }

    // ==================== Administration ====================

    /// Insert or replace an agent's capabilities.
    pub async fn upsert_agent(&self, agent: AgentCapabilities) -> Option<AgentCapabilities> {
        debug!(agent = %agent.name, "Updating agent capabilities");
        self.registry.write().await.insert(agent)
    }

    pub async fn remove_agent(&self, name: &str) -> Option<AgentCapabilities> {
        self.registry.write().await.remove(name)
    }

    pub async fn agent(&self, name: &str) -> Option<AgentCapabilities> {
        self.registry.read().await.get(name).cloned()
    }

    pub async fn agent_names(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // ==================== Resolution ====================

    /// Resolve `tool` as seen by `agent`.
    pub async fn resolve(&self, agent: &str, tool: &str) -> Result<ToolReference, ToolError> {
        let caps = self.capabilities(agent).await?;
        self.resolve_for(&caps, tool).await
    }

    async fn capabilities(&self, agent: &str) -> Result<AgentCapabilities, ToolError> {
        self.agent(agent)
            .await
            .ok_or_else(|| ToolError::agent_not_found(agent))
    }

    async fn resolve_for(&self, caps: &AgentCapabilities, tool: &str) -> Result<ToolReference, ToolError> {
        if let Some(target) = delegation_target(tool).filter(|t| caps.can_delegate_to(t)) {
            return Ok(ToolReference::delegation(target));
        }

        // A granted prefix alone is not enough; the provider must expose the tool.
        if let Some((provider, original)) = caps.remote_grants().resolve(tool)
            && self.remote.owns_tool(tool).await
        {
            return Ok(ToolReference::remote(provider, original));
        }

        if caps.has_local_function(tool) {
            return Ok(ToolReference::local(tool));
        }

        if self.exists_globally(tool).await {
            debug!(agent = %caps.name, tool, "Tool exists but is not granted");
            Err(ToolError::access_denied(&caps.name, tool))
        } else {
            Err(ToolError::unknown_tool(tool))
        }
    }

    /// Whether `tool` names something callable by *some* agent.
    async fn exists_globally(&self, tool: &str) -> bool {
        if self.functions.contains(tool) {
            return true;
        }
        if let Some(target) = delegation_target(tool) {
            if self.registry.read().await.contains(target) {
                return true;
            }
        }
        self.remote.owns_tool(tool).await
    }

    // ==================== Catalog ====================

    /// Every tool `agent` may call: local functions, delegations, then remote tools.
    pub async fn list_tools_for_agent(&self, agent: &str) -> Result<Vec<ToolDescriptor>, ToolError> {
        let caps = self.capabilities(agent).await?;

        let mut tools: Vec<ToolDescriptor> = caps
            .local_functions()
            .iter()
            .filter_map(|name| {
                let function = self.functions.get(name);
                if function.is_none() {
                    warn!(agent, function = %name, "Granted local function is not registered");
                }
                function.map(|f| f.descriptor())
            })
            .collect();

        tools.extend(caps.delegates().iter().map(|d| ToolDescriptor::delegation(d)));
        tools.extend(self.remote.tool_descriptors_for(caps.remote_grants()).await);

        Ok(tools)
    }

    // ==================== Dispatch ====================

    /// Resolve and invoke `tool` as `agent`.
    pub async fn dispatch(&self, agent: &str, tool: &str, arguments: Value) -> Result<Value, ToolError> {
        self.dispatch_chained(vec![agent.to_string()], tool.to_string(), arguments)
            .await
    }

    /// Dispatch as the last agent on `chain`.
    ///
    /// `chain` holds every agent visited by the current delegation, caller first.
    fn dispatch_chained(
        &self,
        chain: Vec<String>,
        tool: String,
        arguments: Value,
    ) -> BoxFuture<'_, Result<Value, ToolError>> {
        async move {
            let agent = chain.last().cloned().unwrap_or_default();
            let caps = self.capabilities(&agent).await?;
            let reference = self.resolve_for(&caps, &tool).await?;
            debug!(agent = %agent, tool = %tool, reference = %reference, "Dispatching tool call");

            match reference {
                ToolReference::LocalFunction { name } => self.call_local(&name, arguments).await,
                ToolReference::Delegation { target_agent } => {
                    self.delegate(chain, target_agent, arguments).await
                }
                ToolReference::RemoteTool {
                    provider,
                    original_name,
                } => {
                    trace!(provider = %provider, original = %original_name, "Forwarding to remote provider");
                    self.remote
                        .call_tool(&tool, arguments, self.params.tool_timeout)
                        .await
                }
            }
        }
        .boxed()
    }

    async fn call_local(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| ToolError::unknown_tool(name))?;

        let timeout = self.params.tool_timeout;
        match tokio::time::timeout(timeout, function.call(arguments)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool: name.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn delegate(
        &self,
        mut chain: Vec<String>,
        target: String,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        if chain.contains(&target) || chain.len() > self.params.max_delegation_depth {
            chain.push(target);
            warn!(chain = %chain.join(" -> "), "Refusing delegation");
            return Err(ToolError::DelegationCycle { chain });
        }

        let (tool, arguments) = match DelegatedCall::parse(arguments) {
            DelegatedCall::Tool { tool, arguments } => (tool, arguments),
            DelegatedCall::Free(input) => {
                let Some(runtime) = &self.runtime else {
                    return Err(ToolError::invalid_arguments(
                        delegation_tool_name(&target),
                        "expected {\"tool\": ..., \"arguments\": {...}}",
                    ));
                };
                // The target must exist even when its runtime does the work.
                self.capabilities(&target).await?;
                debug!(agent = %target, "Handing delegation to agent runtime");
                return runtime.invoke(&target, input).await;
            }
        };

        chain.push(target);
        self.dispatch_chained(chain, tool, arguments).await
    }
}

/// Shape of a delegation's input
enum DelegatedCall {
    /// `{"tool": name, "arguments": {...}}`: call `name` as the target agent
    Tool { tool: String, arguments: Value },
    /// Anything else: hand to the agent runtime
    Free(Value),
}

impl DelegatedCall {
    fn parse(input: Value) -> Self {
        let Value::Object(mut fields) = input else {
            return DelegatedCall::Free(input);
        };
        let tool = match fields.get("tool") {
            Some(Value::String(tool)) => tool.clone(),
            _ => return DelegatedCall::Free(Value::Object(fields)),
        };
        let arguments = fields
            .remove("arguments")
            .unwrap_or_else(|| Value::Object(Map::new()));
        DelegatedCall::Tool { tool, arguments }
    }
}

#[async_trait]
impl<G: RemoteToolGateway + 'static> ToolDispatcher for ToolRouter<G> {
    async fn dispatch(&self, agent: &str, tool: &str, arguments: Value) -> Result<Value, ToolError> {
        ToolRouter::dispatch(self, agent, tool, arguments).await
    }
}
