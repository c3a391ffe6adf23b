//! Provider health monitoring from TOML (`[health]` section)

use crate::remote::HealthSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileHealthConfig {
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
}

impl Default for FileHealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: 60,
            probe_timeout_secs: 10,
        }
    }
}

impl FileHealthConfig {
    pub fn to_health_settings(&self) -> HealthSettings {
        HealthSettings::default()
            .with_probe_interval(Duration::from_secs(self.probe_interval_secs))
            .with_probe_timeout(Duration::from_secs(self.probe_timeout_secs))
    }
}
