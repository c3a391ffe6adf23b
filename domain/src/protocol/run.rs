//! Per-run state, run outcomes and asynchronous job records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle of a protocol run or job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A step whose failure was swallowed by the `continue` policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStep {
    pub phase: String,
    pub step: String,
    pub error: String,
}

/// Mutable state owned by one run.
///
/// Results are only ever added; a failed step never removes what earlier
/// steps stored.
#[derive(Debug, Clone, Default)]
pub struct ExecutionState {
    variables: Map<String, Value>,
    results: Map<String, Value>,
    phases_completed: usize,
    steps_completed: usize,
    skipped_steps: Vec<SkippedStep>,
}

impl ExecutionState {
    /// Merge protocol defaults with caller overrides; the caller wins.
    pub fn new(defaults: &Map<String, Value>, overrides: Map<String, Value>) -> Self {
        let mut variables = defaults.clone();
        variables.extend(overrides);
        Self {
            variables,
            ..Self::default()
        }
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn results(&self) -> &Map<String, Value> {
        &self.results
    }

    pub fn phases_completed(&self) -> usize {
        self.phases_completed
    }

    pub fn steps_completed(&self) -> usize {
        self.steps_completed
    }

    pub fn skipped_steps(&self) -> &[SkippedStep] {
        &self.skipped_steps
    }

    /// Count a successful step, storing its value when it has an output key.
    pub fn record_success(&mut self, output_key: Option<&str>, value: Value) {
        if let Some(key) = output_key {
            self.results.insert(key.to_string(), value);
        }
        self.steps_completed += 1;
    }

    pub fn record_skip(&mut self, phase: &str, step: &str, error: impl Into<String>) {
        self.skipped_steps.push(SkippedStep {
            phase: phase.to_string(),
            step: step.to_string(),
            error: error.into(),
        });
    }

    pub fn complete_phase(&mut self) {
        self.phases_completed += 1;
    }

    pub fn finish(self, protocol: impl Into<String>, error: Option<String>) -> RunResult {
        let status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        RunResult {
            protocol: protocol.into(),
            status,
            results: self.results,
            phases_completed: self.phases_completed,
            steps_completed: self.steps_completed,
            error,
            skipped_steps: self.skipped_steps,
        }
    }
}

/// Outcome of one protocol run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub protocol: String,
    pub status: RunStatus,
    pub results: Map<String, Value>,
    pub phases_completed: usize,
    pub steps_completed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_steps: Vec<SkippedStep>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Opaque job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Record of an asynchronous run, updated in place as it progresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolJob {
    pub id: JobId,
    pub protocol: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub results: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub phases_completed: usize,
    pub steps_completed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_steps: Vec<SkippedStep>,
}

impl ProtocolJob {
    pub fn new(id: JobId, protocol: impl Into<String>) -> Self {
        Self::started_at(id, protocol, Utc::now())
    }

    pub fn started_at(id: JobId, protocol: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            protocol: protocol.into(),
            status: RunStatus::Running,
            started_at,
            completed_at: None,
            results: Map::new(),
            error: None,
            phases_completed: 0,
            steps_completed: 0,
            skipped_steps: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Copy intermediate progress while still running.
    pub fn update_progress(&mut self, state: &ExecutionState) {
        self.results = state.results().clone();
        self.phases_completed = state.phases_completed();
        self.steps_completed = state.steps_completed();
        self.skipped_steps = state.skipped_steps().to_vec();
    }

    /// Move into a terminal status from the run's outcome.
    pub fn finish(&mut self, result: &RunResult) {
        self.finish_at(result, Utc::now());
    }

    pub fn finish_at(&mut self, result: &RunResult, at: DateTime<Utc>) {
        self.status = result.status;
        self.completed_at = Some(at);
        self.results = result.results.clone();
        self.error = result.error.clone();
        self.phases_completed = result.phases_completed;
        self.steps_completed = result.steps_completed;
        self.skipped_steps = result.skipped_steps.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_caller_overrides_win() {
        let defaults = map(json!({"topic": "rust", "depth": 1}));
        let state = ExecutionState::new(&defaults, map(json!({"depth": 3, "extra": true})));
        assert_eq!(
            state.variables(),
            &map(json!({"topic": "rust", "depth": 3, "extra": true}))
        );
    }

    #[test]
    fn test_record_success_without_key_only_counts() {
        let mut state = ExecutionState::default();
        state.record_success(None, json!("ignored"));
        state.record_success(Some("hits"), json!([1, 2]));
        assert_eq!(state.steps_completed(), 2);
        assert_eq!(state.results(), &map(json!({"hits": [1, 2]})));
    }

    #[test]
    fn test_finish_sets_status_from_error() {
        let mut state = ExecutionState::default();
        state.record_success(Some("a"), json!(1));
        state.complete_phase();
        let ok = state.clone().finish("p", None);
        assert_eq!(ok.status, RunStatus::Completed);
        assert_eq!(ok.phases_completed, 1);

        let failed = state.finish("p", Some("boom".into()));
        assert_eq!(failed.status, RunStatus::Failed);
        assert_eq!(failed.results["a"], json!(1));
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = ProtocolJob::new(JobId::from("j1"), "research");
        assert_eq!(job.status, RunStatus::Running);
        assert!(!job.is_finished());

        let mut state = ExecutionState::default();
        state.record_success(Some("x"), json!("partial"));
        job.update_progress(&state);
        assert_eq!(job.steps_completed, 1);
        assert_eq!(job.status, RunStatus::Running);

        state.complete_phase();
        let result = state.finish("research", None);
        job.finish(&result);
        assert!(job.is_finished());
        assert_eq!(job.status, RunStatus::Completed);
        assert!(job.completed_at.is_some());
        assert_eq!(job.results, result.results);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RunStatus::Completed).unwrap(), json!("completed"));
        let job = ProtocolJob::new(JobId::from("abc"), "p");
        let value = serde_json::to_value(&job).unwrap();
        assert_eq!(value["id"], json!("abc"));
        assert_eq!(value["status"], json!("running"));
        assert!(value.get("completed_at").is_none());
    }
}
