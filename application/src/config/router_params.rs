//! Router parameters: delegation depth and remote call timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Static parameters of the [`ToolRouter`](crate::use_cases::tool_router::ToolRouter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterParams {
    /// Longest delegation chain (number of hops) before a call is refused.
    pub max_delegation_depth: usize,
    /// Upper bound on a single tool call, local or remote.
    pub tool_timeout: Duration,
}

impl Default for RouterParams {
    fn default() -> Self {
        Self {
            max_delegation_depth: 8,
            tool_timeout: Duration::from_secs(300),
        }
    }
}

impl RouterParams {
    pub fn with_max_delegation_depth(mut self, depth: usize) -> Self {
        self.max_delegation_depth = depth;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = RouterParams::default();
        assert_eq!(params.max_delegation_depth, 8);
        assert_eq!(params.tool_timeout, Duration::from_secs(300));
    }
}
