//! Agent capabilities and the registry that holds them

use crate::tool::entities::{PROVIDER_SEPARATOR, strip_provider_prefix};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Remote-tool grants of one agent.
///
/// A provider in `full` exposes every tool it currently has. Entries in
/// `partial` are additive narrow grants for providers *not* in `full`; the
/// builder methods keep the two disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGrants {
    full: BTreeSet<String>,
    partial: BTreeMap<String, BTreeSet<String>>,
}

impl RemoteGrants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant every tool of `provider`, dropping any narrower grant for it.
    pub fn grant_provider(&mut self, provider: impl Into<String>) {
        let provider = provider.into();
        self.partial.remove(&provider);
        self.full.insert(provider);
    }

    /// Grant a subset of `provider`'s tools by original name.
    ///
    /// Ignored when the provider is already granted in full.
    pub fn grant_tools<I, S>(&mut self, provider: impl Into<String>, tools: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = provider.into();
        if self.full.contains(&provider) {
            return;
        }
        let entry = self.partial.entry(provider.clone()).or_default();
        for tool in tools {
            let tool = tool.into();
            // Accept the flat form too; store the original name.
            let original = strip_provider_prefix(&provider, &tool)
                .map(str::to_string)
                .unwrap_or(tool);
            entry.insert(original);
        }
    }

    pub fn full_providers(&self) -> impl Iterator<Item = &str> {
        self.full.iter().map(String::as_str)
    }

    pub fn partial_grants(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.partial.iter().map(|(p, tools)| (p.as_str(), tools))
    }

    /// Every provider this agent can reach at all.
    pub fn providers(&self) -> BTreeSet<&str> {
        self.full
            .iter()
            .chain(self.partial.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty() && self.partial.is_empty()
    }

    /// Whether `original_name` on `provider` is visible under these grants.
    pub fn allows(&self, provider: &str, original_name: &str) -> bool {
        self.full.contains(provider)
            || self
                .partial
                .get(provider)
                .is_some_and(|tools| tools.contains(original_name))
    }

    /// Map a flat name onto a granted `(provider, original_name)` pair.
    ///
    /// Provider names may themselves contain the separator, so the longest
    /// matching provider prefix wins.
    pub fn resolve<'a>(&'a self, flat_name: &'a str) -> Option<(&'a str, &'a str)> {
        let mut candidates: Vec<&str> = self
            .providers()
            .into_iter()
            .filter(|p| {
                flat_name.len() > p.len() + 1
                    && flat_name.starts_with(*p)
                    && flat_name[p.len()..].starts_with(PROVIDER_SEPARATOR)
            })
            .collect();
        candidates.sort_by_key(|p| std::cmp::Reverse(p.len()));

        candidates.into_iter().find_map(|provider| {
            let original = strip_provider_prefix(provider, flat_name)?;
            self.allows(provider, original)
                .then_some((provider, original))
        })
    }
}

/// Everything one agent may call: local functions, delegates and remote grants.
///
/// Mutated only by agent administration; read-only to the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub name: String,
    local_functions: Vec<String>,
    delegates: Vec<String>,
    remote: RemoteGrants,
}

impl AgentCapabilities {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            local_functions: Vec::new(),
            delegates: Vec::new(),
            remote: RemoteGrants::new(),
        }
    }

    pub fn with_local_function(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.local_functions.contains(&name) {
            self.local_functions.push(name);
        }
        self
    }

    pub fn with_delegate(mut self, agent: impl Into<String>) -> Self {
        let agent = agent.into();
        if !self.delegates.contains(&agent) {
            self.delegates.push(agent);
        }
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.remote.grant_provider(provider);
        self
    }

    pub fn with_provider_tools<I, S>(mut self, provider: impl Into<String>, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remote.grant_tools(provider, tools);
        self
    }

    pub fn local_functions(&self) -> &[String] {
        &self.local_functions
    }

    pub fn delegates(&self) -> &[String] {
        &self.delegates
    }

    pub fn remote_grants(&self) -> &RemoteGrants {
        &self.remote
    }

    pub fn has_local_function(&self, name: &str) -> bool {
        self.local_functions.iter().any(|f| f == name)
    }

    pub fn can_delegate_to(&self, agent: &str) -> bool {
        self.delegates.iter().any(|d| d == agent)
    }
}

/// Owned store of every agent's capabilities, built from configuration at start-up.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    agents: HashMap<String, AgentCapabilities>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_agents(agents: impl IntoIterator<Item = AgentCapabilities>) -> Self {
        let mut registry = Self::new();
        for agent in agents {
            registry.insert(agent);
        }
        registry
    }

    /// Insert or replace an agent, returning the previous definition.
    pub fn insert(&mut self, agent: AgentCapabilities) -> Option<AgentCapabilities> {
        self.agents.insert(agent.name.clone(), agent)
    }

    pub fn remove(&mut self, name: &str) -> Option<AgentCapabilities> {
        self.agents.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&AgentCapabilities> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn agents(&self) -> impl Iterator<Item = &AgentCapabilities> {
        self.agents.values()
    }

    /// Agent names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_grant_drops_partial() {
        let agent = AgentCapabilities::new("a")
            .with_provider_tools("github", ["search"])
            .with_provider("github");
        assert_eq!(agent.remote_grants().partial_grants().count(), 0);
        assert!(agent.remote_grants().allows("github", "anything"));
    }

    #[test]
    fn test_partial_ignored_after_full() {
        let agent = AgentCapabilities::new("a")
            .with_provider("github")
            .with_provider_tools("github", ["search"]);
        assert_eq!(agent.remote_grants().partial_grants().count(), 0);
    }

    #[test]
    fn test_partial_accepts_flat_names() {
        let agent = AgentCapabilities::new("a").with_provider_tools("web", ["web_fetch", "search"]);
        let grants = agent.remote_grants();
        assert!(grants.allows("web", "fetch"));
        assert!(grants.allows("web", "search"));
        assert!(!grants.allows("web", "crawl"));
    }

    #[test]
    fn test_resolve_full_and_partial() {
        let agent = AgentCapabilities::new("a")
            .with_provider("memory")
            .with_provider_tools("web", ["search"]);
        let grants = agent.remote_grants();

        assert_eq!(grants.resolve("memory_store"), Some(("memory", "store")));
        assert_eq!(grants.resolve("web_search"), Some(("web", "search")));
        assert_eq!(grants.resolve("web_crawl"), None);
        assert_eq!(grants.resolve("memory_"), None);
        assert_eq!(grants.resolve("other_store"), None);
    }

    #[test]
    fn test_resolve_prefers_longest_provider() {
        let agent = AgentCapabilities::new("a")
            .with_provider("code")
            .with_provider("code_index");
        assert_eq!(
            agent.remote_grants().resolve("code_index_lookup"),
            Some(("code_index", "lookup"))
        );
        assert_eq!(
            agent.remote_grants().resolve("code_format"),
            Some(("code", "format"))
        );
    }

    #[test]
    fn test_resolve_falls_back_when_longest_not_granted() {
        // "code_index" is only partially granted; "code" is full.
        let agent = AgentCapabilities::new("a")
            .with_provider("code")
            .with_provider_tools("code_index", ["lookup"]);
        assert_eq!(
            agent.remote_grants().resolve("code_index_rebuild"),
            Some(("code", "index_rebuild"))
        );
    }

    #[test]
    fn test_ordered_sets_deduplicate() {
        let agent = AgentCapabilities::new("a")
            .with_local_function("echo")
            .with_local_function("time")
            .with_local_function("echo")
            .with_delegate("b")
            .with_delegate("b");
        assert_eq!(agent.local_functions(), ["echo", "time"]);
        assert_eq!(agent.delegates(), ["b"]);
        assert!(agent.can_delegate_to("b"));
        assert!(!agent.can_delegate_to("c"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = CapabilityRegistry::from_agents([
            AgentCapabilities::new("writer"),
            AgentCapabilities::new("researcher"),
        ]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("writer"));
        assert!(registry.get("nobody").is_none());
        assert_eq!(registry.names(), vec!["researcher", "writer"]);
    }

    #[test]
    fn test_registry_insert_replaces() {
        let mut registry = CapabilityRegistry::new();
        assert!(registry.insert(AgentCapabilities::new("a")).is_none());
        let previous = registry.insert(AgentCapabilities::new("a").with_local_function("echo"));
        assert!(previous.is_some());
        assert!(registry.get("a").unwrap().has_local_function("echo"));
        assert!(registry.remove("a").is_some());
        assert!(registry.is_empty());
    }
}
