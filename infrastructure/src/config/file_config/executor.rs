//! Protocol executor configuration from TOML (`[executor]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use toolmesh_application::{ExecutionParams, JobRetention};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    /// Agent identity every protocol step is dispatched as
    pub agent: String,
    /// Linear backoff unit between retries
    pub retry_base_delay_ms: u64,
    /// Finished jobs kept in memory
    pub job_capacity: usize,
    /// Lifetime of a finished job
    pub job_ttl_secs: u64,
    /// Where protocols are looked up by name
    pub protocols_dir: PathBuf,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            agent: "orchestrator".to_string(),
            retry_base_delay_ms: 1000,
            job_capacity: 1000,
            job_ttl_secs: 86_400,
            protocols_dir: PathBuf::from("protocols"),
        }
    }
}

impl FileExecutorConfig {
    pub fn to_execution_params(&self) -> ExecutionParams {
        ExecutionParams::default()
            .with_agent(&self.agent)
            .with_retry_base_delay(Duration::from_millis(self.retry_base_delay_ms))
            .with_retention(JobRetention {
                capacity: self.job_capacity,
                ttl: Duration::from_secs(self.job_ttl_secs),
            })
    }
}
