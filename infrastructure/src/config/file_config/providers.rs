//! Remote provider entries from TOML (`[[providers]]` tables)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolmesh_domain::{ProviderConfig, TransportKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    pub name: String,
    pub url: String,
    pub transport: TransportKind,
    /// Direct bearer token (prefer `token_env`)
    pub token: Option<String>,
    /// Environment variable holding the bearer token
    pub token_env: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl FileProviderConfig {
    /// Resolve into a [`ProviderConfig`], reading `token_env` when no direct token is set.
    pub fn to_provider_config(&self) -> ProviderConfig {
        let token = self.token.clone().or_else(|| {
            self.token_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
                .filter(|t| !t.is_empty())
        });

        let mut config = ProviderConfig::new(&self.name, &self.url).with_transport(self.transport);
        config.token = token;
        config.headers = self.headers.clone();
        config
    }
}
