//! Execution observer port
//!
//! Lifecycle callbacks for protocol runs. Implementations live in the
//! presentation layer (spinners, console lines); all methods default to
//! no-ops.

use std::time::Duration;
use toolmesh_domain::{ErrorPolicy, RunResult, ToolError};

/// Callback for progress updates during a protocol run
pub trait ExecutionObserver: Send + Sync {
    fn on_run_start(&self, _protocol: &str, _total_steps: usize) {}

    fn on_phase_start(&self, _phase: &str, _index: usize, _total: usize) {}

    fn on_step_start(&self, _phase: &str, _step: &str, _tool: &str) {}

    /// Called before sleeping ahead of retry number `retry` (1-based).
    fn on_step_retry(&self, _step: &str, _retry: u32, _delay: Duration, _error: &ToolError) {}

    fn on_step_complete(&self, _step: &str) {}

    /// Called when a step has failed for good under `policy`.
    fn on_step_failed(&self, _step: &str, _policy: ErrorPolicy, _error: &ToolError) {}

    fn on_phase_complete(&self, _phase: &str) {}

    fn on_run_complete(&self, _result: &RunResult) {}
}

/// No-op observer for when progress reporting is not needed
pub struct NoObserver;

impl ExecutionObserver for NoObserver {}
