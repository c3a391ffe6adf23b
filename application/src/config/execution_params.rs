//! Execution parameters: protocol run identity, retry pacing and job retention.
//!
//! [`ExecutionParams`] groups the static parameters of
//! [`ProtocolExecutor`](crate::use_cases::protocol_executor::ProtocolExecutor)
//! and its [`JobStore`](crate::use_cases::job_store::JobStore).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Protocol executor parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Agent identity every step is dispatched as.
    pub agent: String,
    /// Delay before retry *k* is `k * retry_base_delay`.
    pub retry_base_delay: Duration,
    /// Job retention bounds.
    pub retention: JobRetention,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            agent: "orchestrator".to_string(),
            retry_base_delay: Duration::from_millis(1000),
            retention: JobRetention::default(),
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_retention(mut self, retention: JobRetention) -> Self {
        self.retention = retention;
        self
    }

    /// Delay before the given retry (1-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        self.retry_base_delay.saturating_mul(retry)
    }
}

/// How many finished jobs are kept, and for how long.
///
/// Running jobs are never evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRetention {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for JobRetention {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ExecutionParams::default();
        assert_eq!(params.agent, "orchestrator");
        assert_eq!(params.retry_base_delay, Duration::from_secs(1));
        assert_eq!(params.retention.capacity, 1000);
        assert_eq!(params.retention.ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn test_linear_backoff() {
        let params = ExecutionParams::default().with_retry_base_delay(Duration::from_millis(250));
        assert_eq!(params.retry_delay(1), Duration::from_millis(250));
        assert_eq!(params.retry_delay(3), Duration::from_millis(750));
    }
}
