//! Connection manager for remote tool providers
//!
//! Owns one transport per provider, the provider's tool list (stored under
//! the provider's original names) and its health flag. Flat names are formed
//! on the way out (`provider_tool`) and stripped on the way in.
//!
//! A provider whose handshake fails stays registered, unhealthy and without
//! tools; the next successful probe re-runs the handshake and discovery. A
//! failed probe never removes the provider. When a ping fails the transport
//! is closed and dropped, so the following probe reconnects from scratch
//! while the provider keeps its last known tools.

use super::error::{RemoteError, Result};
use super::protocol::{CallToolResult, ListToolsResult, McpTool, initialize_params};
use super::transport::{McpTransport, TransportFactory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use toolmesh_application::RemoteToolGateway;
use toolmesh_domain::{
    ProviderConfig, ProviderHealth, RemoteGrants, ToolDescriptor, ToolError, ToolReference,
    strip_provider_prefix,
};
use tracing::{debug, info, warn};

/// Upper bound on `tools/list` pages fetched per discovery.
const MAX_TOOL_PAGES: usize = 64;

/// Timing of connects and health probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSettings {
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl HealthSettings {
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

struct ProviderEntry {
    config: ProviderConfig,
    transport: Option<Arc<dyn McpTransport>>,
    healthy: bool,
    initialized: bool,
    last_probe: Option<DateTime<Utc>>,
    last_error: Option<String>,
    tools: Vec<McpTool>,
}

impl ProviderEntry {
    fn snapshot(&self) -> ProviderHealth {
        ProviderHealth {
            name: self.config.name.clone(),
            transport: self.config.transport,
            healthy: self.healthy,
            last_probe: self.last_probe,
            tool_count: self.tools.len(),
            last_error: self.last_error.clone(),
        }
    }

    fn has_tool(&self, original: &str) -> bool {
        self.tools.iter().any(|t| t.name == original)
    }
}

/// Outcome of one probe, applied under the write lock afterwards.
enum ProbeOutcome {
    Alive,
    Initialized {
        transport: Arc<dyn McpTransport>,
        tools: Vec<McpTool>,
    },
    /// Opening or initializing failed; the next probe starts from scratch.
    Failed { error: String },
    /// An initialized transport stopped answering and was closed.
    Lost { error: String },
}

pub struct ConnectionManager {
    factory: Arc<dyn TransportFactory>,
    providers: RwLock<BTreeMap<String, ProviderEntry>>,
    settings: HealthSettings,
}

impl ConnectionManager {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            providers: RwLock::new(BTreeMap::new()),
            settings: HealthSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: HealthSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> HealthSettings {
        self.settings
    }

    // ==================== Lifecycle ====================

    /// Open, handshake and discover a provider.
    ///
    /// A failed handshake still registers the provider (unhealthy, no tools)
    /// and returns its health; only a duplicate name is an error.
    pub async fn connect(&self, config: ProviderConfig) -> Result<ProviderHealth> {
        if self.providers.read().await.contains_key(&config.name) {
            return Err(RemoteError::AlreadyConnected(config.name));
        }

        let name = config.name.clone();
        debug!(provider = %name, url = %config.url, transport = %config.transport, "Connecting provider");

        let (transport, outcome) = match tokio::time::timeout(
            self.settings.connect_timeout,
            self.factory.open(&config),
        )
        .await
        {
            Ok(Ok(transport)) => {
                let outcome = tokio::time::timeout(
                    self.settings.connect_timeout,
                    Self::handshake(transport.as_ref()),
                )
                .await
                .unwrap_or_else(|_| {
                    Err(RemoteError::timeout("handshake", self.settings.connect_timeout))
                });
                (Some(transport), outcome)
            }
            Ok(Err(e)) => (None, Err(e)),
            Err(_) => (
                None,
                Err(RemoteError::timeout("connect", self.settings.connect_timeout)),
            ),
        };

        let mut entry = ProviderEntry {
            config,
            transport,
            healthy: false,
            initialized: false,
            last_probe: Some(Utc::now()),
            last_error: None,
            tools: Vec::new(),
        };
        match outcome {
            Ok(tools) => {
                info!(provider = %name, tools = tools.len(), "Provider connected");
                entry.healthy = true;
                entry.initialized = true;
                entry.tools = tools;
            }
            Err(e) => {
                warn!(provider = %name, error = %e, "Provider handshake failed, registered as unhealthy");
                entry.last_error = Some(e.to_string());
            }
        }

        let mut providers = self.providers.write().await;
        if providers.contains_key(&name) {
            // Lost a race with a concurrent connect of the same name.
            drop(providers);
            if let Some(transport) = entry.transport {
                transport.close().await;
            }
            return Err(RemoteError::AlreadyConnected(name));
        }
        let health = entry.snapshot();
        providers.insert(name, entry);
        Ok(health)
    }

    /// Close the provider's transport and forget its tools.
    pub async fn disconnect(&self, name: &str) -> Result<()> {
        let entry = self
            .providers
            .write()
            .await
            .remove(name)
            .ok_or_else(|| RemoteError::ProviderNotFound(name.to_string()))?;
        if let Some(transport) = entry.transport {
            transport.close().await;
        }
        info!(provider = %name, "Provider disconnected");
        Ok(())
    }

    /// Disconnect everything, then connect each config in order.
    pub async fn reload(&self, configs: Vec<ProviderConfig>) -> Vec<ProviderHealth> {
        self.shutdown().await;

        let mut health = Vec::with_capacity(configs.len());
        for config in configs {
            match self.connect(config).await {
                Ok(h) => health.push(h),
                Err(e) => warn!(error = %e, "Skipping provider during reload"),
            }
        }
        health
    }

    /// Close every transport and clear the table.
    pub async fn shutdown(&self) {
        let entries = std::mem::take(&mut *self.providers.write().await);
        for (name, entry) in entries {
            if let Some(transport) = entry.transport {
                debug!(provider = %name, "Closing transport");
                transport.close().await;
            }
        }
    }

    async fn handshake(transport: &dyn McpTransport) -> Result<Vec<McpTool>> {
        transport
            .request("initialize", Some(initialize_params()))
            .await?;
        if let Err(e) = transport.notify("notifications/initialized", None).await {
            debug!(error = %e, "initialized notification not accepted");
        }
        Self::list_all_tools(transport).await
    }

    async fn list_all_tools(transport: &dyn McpTransport) -> Result<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.take().map(|c| serde_json::json!({"cursor": c}));
            let page: ListToolsResult =
                serde_json::from_value(transport.request("tools/list", params).await?)?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        warn!(pages = MAX_TOOL_PAGES, "Tool listing truncated");
        Ok(tools)
    }

    // ==================== Tools ====================

    /// Re-run `tools/list` for one provider, returning the new tool count.
    pub async fn refresh_tools(&self, name: &str) -> Result<usize> {
        let transport = {
            let providers = self.providers.read().await;
            let entry = providers
                .get(name)
                .ok_or_else(|| RemoteError::ProviderNotFound(name.to_string()))?;
            entry
                .transport
                .clone()
                .ok_or_else(|| RemoteError::ProviderUnhealthy(name.to_string()))?
        };

        let tools = Self::list_all_tools(transport.as_ref()).await?;
        let count = tools.len();

        let mut providers = self.providers.write().await;
        let entry = providers
            .get_mut(name)
            .ok_or_else(|| RemoteError::ProviderNotFound(name.to_string()))?;
        entry.tools = tools;
        debug!(provider = %name, tools = count, "Tools refreshed");
        Ok(count)
    }

    /// The provider that owns `flat_name`, with the original tool name.
    ///
    /// Provider names may contain the separator; the longest owning prefix wins.
    pub async fn owner(&self, flat_name: &str) -> Option<(String, String)> {
        let providers = self.providers.read().await;
        let mut candidates: Vec<(&String, &ProviderEntry)> = providers
            .iter()
            .filter(|(name, _)| strip_provider_prefix(name, flat_name).is_some())
            .collect();
        candidates.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));

        candidates.into_iter().find_map(|(name, entry)| {
            let original = strip_provider_prefix(name, flat_name)?;
            entry
                .has_tool(original)
                .then(|| (name.clone(), original.to_string()))
        })
    }

    /// Call a remote tool by flat name, bounded by `timeout`.
    pub async fn call_tool(
        &self,
        flat_name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let (provider, original) = self
            .owner(flat_name)
            .await
            .ok_or_else(|| RemoteError::ToolNotFound(flat_name.to_string()))?;
        let transport = {
            let providers = self.providers.read().await;
            let entry = providers
                .get(&provider)
                .ok_or_else(|| RemoteError::ToolNotFound(flat_name.to_string()))?;
            match (&entry.transport, entry.healthy) {
                (Some(transport), true) => Arc::clone(transport),
                _ => return Err(RemoteError::ProviderUnhealthy(provider)),
            }
        };

        debug!(provider = %provider, tool = %original, "Calling remote tool");
        let params = serde_json::json!({"name": original, "arguments": arguments});
        let raw = tokio::time::timeout(timeout, transport.request("tools/call", Some(params)))
            .await
            .map_err(|_| RemoteError::timeout(format!("tools/call {}", flat_name), timeout))??;

        let result: CallToolResult = serde_json::from_value(raw)?;
        result
            .into_value()
            .map_err(|message| RemoteError::ToolFailed {
                provider,
                tool: original,
                message,
            })
    }

    /// Remote tools visible to `agent` under `grants`.
    pub async fn list_tools_for_agent(&self, agent: &str, grants: &RemoteGrants) -> Vec<ToolReference> {
        let providers = self.providers.read().await;
        let refs: Vec<ToolReference> = providers
            .iter()
            .flat_map(|(name, entry)| {
                entry
                    .tools
                    .iter()
                    .filter(move |tool| grants.allows(name, &tool.name))
                    .map(move |tool| ToolReference::remote(name, &tool.name))
            })
            .collect();
        debug!(agent, tools = refs.len(), "Listed remote tools");
        refs
    }

    /// Catalog entries, in flat-name form, visible under `grants`.
    pub async fn tool_descriptors_for(&self, grants: &RemoteGrants) -> Vec<ToolDescriptor> {
        let providers = self.providers.read().await;
        providers
            .iter()
            .flat_map(|(name, entry)| {
                entry
                    .tools
                    .iter()
                    .filter(move |tool| grants.allows(name, &tool.name))
                    .map(move |tool| tool.to_descriptor(name))
            })
            .collect()
    }

    // ==================== Health ====================

    /// Health of every provider, sorted by name.
    pub async fn health(&self) -> Vec<ProviderHealth> {
        self.providers
            .read()
            .await
            .values()
            .map(ProviderEntry::snapshot)
            .collect()
    }

    /// Probe every provider once, concurrently.
    pub async fn probe_all(&self) {
        let targets: Vec<(ProviderConfig, Option<Arc<dyn McpTransport>>, bool)> = self
            .providers
            .read()
            .await
            .values()
            .map(|e| (e.config.clone(), e.transport.clone(), e.initialized))
            .collect();

        let probes = targets.into_iter().map(|(config, transport, initialized)| async move {
            let outcome = self.probe(&config, transport, initialized).await;
            (config.name, outcome)
        });
        let outcomes = futures::future::join_all(probes).await;

        let now = Utc::now();
        let mut providers = self.providers.write().await;
        for (name, outcome) in outcomes {
            // Disconnected while the probe was in flight.
            let Some(entry) = providers.get_mut(&name) else {
                continue;
            };
            entry.last_probe = Some(now);
            let was_healthy = entry.healthy;
            match outcome {
                ProbeOutcome::Alive => {
                    entry.healthy = true;
                    entry.last_error = None;
                }
                ProbeOutcome::Initialized { transport, tools } => {
                    info!(provider = %name, tools = tools.len(), "Provider initialized on probe");
                    entry.transport = Some(transport);
                    entry.tools = tools;
                    entry.initialized = true;
                    entry.healthy = true;
                    entry.last_error = None;
                }
                ProbeOutcome::Failed { error } => {
                    entry.transport = None;
                    entry.healthy = false;
                    entry.last_error = Some(error);
                }
                ProbeOutcome::Lost { error } => {
                    debug!(provider = %name, "Dropping dead transport, will reconnect");
                    entry.transport = None;
                    entry.initialized = false;
                    entry.healthy = false;
                    entry.last_error = Some(error);
                }
            }
            match (was_healthy, entry.healthy) {
                (true, false) => warn!(
                    provider = %name,
                    error = entry.last_error.as_deref().unwrap_or_default(),
                    "Provider became unhealthy"
                ),
                (false, true) => info!(provider = %name, "Provider recovered"),
                _ => {}
            }
        }
    }

    async fn probe(
        &self,
        config: &ProviderConfig,
        transport: Option<Arc<dyn McpTransport>>,
        initialized: bool,
    ) -> ProbeOutcome {
        let timeout = self.settings.probe_timeout;

        let transport = match transport {
            Some(transport) => transport,
            None => match tokio::time::timeout(timeout, self.factory.open(config)).await {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => {
                    return ProbeOutcome::Failed {
                        error: e.to_string(),
                    };
                }
                Err(_) => {
                    return ProbeOutcome::Failed {
                        error: RemoteError::timeout("connect", timeout).to_string(),
                    };
                }
            },
        };

        if initialized {
            let error = match tokio::time::timeout(timeout, transport.request("ping", None)).await {
                Ok(Ok(_)) => return ProbeOutcome::Alive,
                Ok(Err(e)) => e.to_string(),
                Err(_) => RemoteError::timeout("ping", timeout).to_string(),
            };
            Self::close_quietly(transport.as_ref(), timeout).await;
            return ProbeOutcome::Lost { error };
        }

        let error = match tokio::time::timeout(timeout, Self::handshake(transport.as_ref())).await {
            Ok(Ok(tools)) => return ProbeOutcome::Initialized { transport, tools },
            Ok(Err(e)) => e.to_string(),
            Err(_) => RemoteError::timeout("handshake", timeout).to_string(),
        };
        Self::close_quietly(transport.as_ref(), timeout).await;
        ProbeOutcome::Failed { error }
    }

    async fn close_quietly(transport: &dyn McpTransport, timeout: Duration) {
        if tokio::time::timeout(timeout, transport.close()).await.is_err() {
            debug!("Transport close timed out");
        }
    }

    /// Probe on a fixed interval until `cancel` fires.
    pub fn spawn_health_monitor(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let period = self.settings.probe_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; connect already probed.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Health monitor stopped");
                        break;
                    }
                    _ = ticker.tick() => manager.probe_all().await,
                }
            }
        })
    }
}

#[async_trait]
impl RemoteToolGateway for ConnectionManager {
    async fn call_tool(
        &self,
        flat_name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> std::result::Result<Value, ToolError> {
        let provider = self.owner(flat_name).await.map(|(p, _)| p);
        ConnectionManager::call_tool(self, flat_name, arguments, timeout)
            .await
            .map_err(|e| e.into_tool_error(provider.as_deref(), flat_name))
    }

    async fn owns_tool(&self, flat_name: &str) -> bool {
        self.owner(flat_name).await.is_some()
    }

    async fn tool_descriptors_for(&self, grants: &RemoteGrants) -> Vec<ToolDescriptor> {
        ConnectionManager::tool_descriptors_for(self, grants).await
    }
}
