//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain and application
//! types by the `to_*` methods.

mod agents;
mod executor;
mod health;
mod providers;
mod router;

pub use agents::FileAgentConfig;
pub use executor::FileExecutorConfig;
pub use health::FileHealthConfig;
pub use providers::FileProviderConfig;
pub use router::FileRouterConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use toolmesh_domain::{CapabilityRegistry, ProviderConfig};

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("{field} cannot be 0")]
    ZeroValue { field: &'static str },

    #[error("{section} entry has an empty name")]
    EmptyName { section: &'static str },

    #[error("duplicate {section} name: {name}")]
    DuplicateName { section: &'static str, name: String },

    #[error("provider '{provider}' has an invalid url: {url}")]
    InvalidUrl { provider: String, url: String },

    #[error("agent '{agent}' references unknown provider '{provider}'")]
    UnknownProvider { agent: String, provider: String },

    #[error("agent '{agent}' delegates to unknown agent '{delegate}'")]
    UnknownDelegate { agent: String, delegate: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tool routing limits
    pub router: FileRouterConfig,
    /// Provider probing
    pub health: FileHealthConfig,
    /// Protocol runs and job retention
    pub executor: FileExecutorConfig,
    /// Remote tool providers
    pub providers: Vec<FileProviderConfig>,
    /// Agents and their grants
    pub agents: Vec<FileAgentConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let zero_checks = [
            (
                "router.default_tool_timeout_secs",
                self.router.default_tool_timeout_secs,
            ),
            ("health.probe_interval_secs", self.health.probe_interval_secs),
            ("health.probe_timeout_secs", self.health.probe_timeout_secs),
            ("executor.job_capacity", self.executor.job_capacity as u64),
        ];
        if let Some(&(field, _)) = zero_checks.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::ZeroValue { field });
        }

        let mut providers = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName {
                    section: "providers",
                });
            }
            if !providers.insert(provider.name.as_str()) {
                return Err(ConfigValidationError::DuplicateName {
                    section: "providers",
                    name: provider.name.clone(),
                });
            }
            let valid_url = reqwest::Url::parse(&provider.url)
                .is_ok_and(|url| matches!(url.scheme(), "http" | "https"));
            if !valid_url {
                return Err(ConfigValidationError::InvalidUrl {
                    provider: provider.name.clone(),
                    url: provider.url.clone(),
                });
            }
        }

        let mut agents = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyName { section: "agents" });
            }
            if !agents.insert(agent.name.as_str()) {
                return Err(ConfigValidationError::DuplicateName {
                    section: "agents",
                    name: agent.name.clone(),
                });
            }
        }

        for agent in &self.agents {
            if let Some(provider) = agent
                .referenced_providers()
                .find(|p| !providers.contains(p))
            {
                return Err(ConfigValidationError::UnknownProvider {
                    agent: agent.name.clone(),
                    provider: provider.to_string(),
                });
            }
            if let Some(delegate) = agent
                .delegates
                .iter()
                .find(|d| !agents.contains(d.as_str()))
            {
                return Err(ConfigValidationError::UnknownDelegate {
                    agent: agent.name.clone(),
                    delegate: delegate.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn provider_configs(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .map(FileProviderConfig::to_provider_config)
            .collect()
    }

    pub fn capability_registry(&self) -> CapabilityRegistry {
        CapabilityRegistry::from_agents(self.agents.iter().map(FileAgentConfig::to_capabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use toolmesh_domain::TransportKind;

    const FULL: &str = r#"
[router]
max_delegation_depth = 4
default_tool_timeout_secs = 120

[health]
probe_interval_secs = 30

[executor]
agent = "planner"
retry_base_delay_ms = 250
protocols_dir = "flows"

[[providers]]
name = "github"
url = "http://localhost:3001/mcp"

[[providers]]
name = "search"
url = "https://search.internal/sse"
transport = "sse"
token = "abc"
headers = { "X-Team" = "core" }

[[agents]]
name = "planner"
local_functions = ["echo"]
delegates = ["researcher"]
mcp_servers = ["github"]

[[agents]]
name = "researcher"
[agents.mcp_tools]
search = ["web_search"]
"#;

    #[test]
    fn test_deserialize_full_config() {
        let config: FileConfig = toml::from_str(FULL).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.router.max_delegation_depth, 4);
        assert_eq!(config.health.probe_interval_secs, 30);
        assert_eq!(config.health.probe_timeout_secs, 10);
        assert_eq!(config.executor.agent, "planner");
        assert_eq!(config.executor.job_capacity, 1000);

        let providers = config.provider_configs();
        assert_eq!(providers[0].transport, TransportKind::StreamableHttp);
        assert_eq!(providers[1].transport, TransportKind::Sse);
        assert_eq!(providers[1].token.as_deref(), Some("abc"));
        assert_eq!(providers[1].headers["X-Team"], "core");

        let registry = config.capability_registry();
        assert_eq!(registry.names(), vec!["planner", "researcher"]);
        let planner = registry.get("planner").unwrap();
        assert!(planner.has_local_function("echo"));
        assert!(planner.can_delegate_to("researcher"));
        let researcher = registry.get("researcher").unwrap();
        assert!(researcher.remote_grants().allows("search", "web_search"));
        assert!(!researcher.remote_grants().allows("search", "news"));
    }

    #[test]
    fn test_conversions_carry_values() {
        let config: FileConfig = toml::from_str(FULL).unwrap();
        let router = config.router.to_router_params();
        assert_eq!(router.max_delegation_depth, 4);
        assert_eq!(router.tool_timeout, Duration::from_secs(120));

        let exec = config.executor.to_execution_params();
        assert_eq!(exec.agent, "planner");
        assert_eq!(exec.retry_base_delay, Duration::from_millis(250));

        let health = config.health.to_health_settings();
        assert_eq!(health.probe_interval, Duration::from_secs(30));
        assert_eq!(health.probe_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let config: FileConfig = toml::from_str("[health]\nprobe_timeout_secs = 0").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroValue {
                field: "health.probe_timeout_secs"
            })
        );
    }

    #[test]
    fn test_validate_duplicate_provider() {
        let config: FileConfig = toml::from_str(
            r#"
[[providers]]
name = "a"
url = "http://x"
[[providers]]
name = "a"
url = "http://y"
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::DuplicateName { section: "providers", .. })
        ));
    }

    #[test]
    fn test_validate_bad_url() {
        let config: FileConfig =
            toml::from_str("[[providers]]\nname = \"a\"\nurl = \"ftp://x\"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_unknown_references() {
        let config: FileConfig =
            toml::from_str("[[agents]]\nname = \"a\"\nmcp_servers = [\"ghost\"]").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::UnknownProvider {
                agent: "a".into(),
                provider: "ghost".into()
            })
        );

        let config: FileConfig =
            toml::from_str("[[agents]]\nname = \"a\"\ndelegates = [\"b\"]").unwrap();
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::UnknownDelegate {
                agent: "a".into(),
                delegate: "b".into()
            })
        );
    }

    #[test]
    fn test_token_env_resolution() {
        let var = "TOOLMESH_TEST_TOKEN_ENV_RESOLUTION";
        // SAFETY: test-local variable name, not read by any other test.
        unsafe { std::env::set_var(var, "from-env") };

        let provider = FileProviderConfig {
            name: "p".into(),
            url: "http://x".into(),
            token_env: Some(var.into()),
            ..Default::default()
        };
        assert_eq!(provider.to_provider_config().token.as_deref(), Some("from-env"));

        let direct = FileProviderConfig {
            token: Some("direct".into()),
            ..provider
        };
        assert_eq!(direct.to_provider_config().token.as_deref(), Some("direct"));
    }
}
