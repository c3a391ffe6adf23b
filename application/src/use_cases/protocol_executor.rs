//! Protocol Executor use case
//!
//! Runs a [`ProtocolDefinition`] phase by phase, step by step. Each step's
//! argument template is rendered against the run's variables and earlier
//! results, then dispatched through the [`ToolDispatcher`] as the executor's
//! agent identity. Per-step `on_error` policies decide whether a failure
//! aborts the run, is skipped, or is retried with linear backoff.
//!
//! Runs can be awaited directly ([`ProtocolExecutor::execute`]) or started
//! as background jobs ([`ProtocolExecutor::execute_async`]) tracked in a
//! [`JobStore`].

use crate::config::ExecutionParams;
use crate::ports::execution_observer::{ExecutionObserver, NoObserver};
use crate::ports::tool_dispatcher::ToolDispatcher;
use crate::use_cases::job_store::JobStore;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use toolmesh_domain::protocol::interpolation;
use toolmesh_domain::{
    ErrorPolicy, ExecutionState, JobId, Phase, ProtocolDefinition, ProtocolJob, RunResult, Step,
    ToolError,
};
use tracing::{debug, info, warn};

/// A step that failed for good
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Step '{step}' in phase '{phase}' failed after {attempts} attempt(s) [{policy}]: {source}")]
pub struct StepFailure {
    pub phase: String,
    pub step: String,
    pub policy: ErrorPolicy,
    pub attempts: u32,
    pub source: ToolError,
}

/// Errors from job queries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),
}

/// Use case for running protocols
pub struct ProtocolExecutor<D: ToolDispatcher + 'static> {
    dispatcher: Arc<D>,
    jobs: Arc<JobStore>,
    /// Set once a store was injected; `with_params` then leaves it alone.
    shared_jobs: bool,
    params: ExecutionParams,
}

impl<D: ToolDispatcher + 'static> ProtocolExecutor<D> {
    pub fn new(dispatcher: Arc<D>) -> Self {
        let params = ExecutionParams::default();
        Self {
            dispatcher,
            jobs: Arc::new(JobStore::new(params.retention)),
            shared_jobs: false,
            params,
        }
    }

    /// Replace the parameters.
    ///
    /// The owned job store is rebuilt with the new retention; an injected
    /// store keeps its own retention whatever the call order.
    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        if !self.shared_jobs {
            self.jobs = Arc::new(JobStore::new(params.retention));
        }
        self.params = params;
        self
    }

    pub fn with_job_store(mut self, jobs: Arc<JobStore>) -> Self {
        self.jobs = jobs;
        self.shared_jobs = true;
        self
    }

    pub fn params(&self) -> &ExecutionParams {
        &self.params
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    // ==================== Synchronous ====================

    /// Run to completion with default (no-op) observation.
    pub async fn execute(&self, protocol: &ProtocolDefinition, variables: Map<String, Value>) -> RunResult {
        self.execute_with_observer(protocol, variables, &NoObserver).await
    }

    /// Run to completion, reporting lifecycle events to `observer`.
    pub async fn execute_with_observer(
        &self,
        protocol: &ProtocolDefinition,
        variables: Map<String, Value>,
        observer: &dyn ExecutionObserver,
    ) -> RunResult {
        self.run(protocol, variables, observer, None).await
    }

    // ==================== Asynchronous ====================

    /// Start a background run and return its job id immediately.
    pub async fn execute_async(self: &Arc<Self>, protocol: ProtocolDefinition, variables: Map<String, Value>) -> JobId {
        self.execute_async_with_observer(protocol, variables, Arc::new(NoObserver))
            .await
    }

    pub async fn execute_async_with_observer(
        self: &Arc<Self>,
        protocol: ProtocolDefinition,
        variables: Map<String, Value>,
        observer: Arc<dyn ExecutionObserver>,
    ) -> JobId {
        let id = JobId::new(uuid::Uuid::new_v4().to_string());
        self.jobs
            .insert(ProtocolJob::new(id.clone(), protocol.name()))
            .await;
        info!(job = %id, protocol = %protocol.name(), "Started protocol job");

        let executor = Arc::clone(self);
        let job_id = id.clone();
        tokio::spawn(async move {
            let result = executor
                .run(&protocol, variables, observer.as_ref(), Some(&job_id))
                .await;
            let found = executor.jobs.update(&job_id, |job| job.finish(&result)).await;
            if !found {
                warn!(job = %job_id, "Job was evicted before it finished");
            }
            debug!(job = %job_id, status = %result.status, "Protocol job finished");
        });

        id
    }

    /// Snapshot of a job; a pure read.
    pub async fn get_job(&self, id: &JobId) -> Result<ProtocolJob, ExecutorError> {
        self.jobs
            .get(id)
            .await
            .ok_or_else(|| ExecutorError::JobNotFound(id.clone()))
    }

    /// Every retained job, newest first.
    pub async fn list_jobs(&self) -> Vec<ProtocolJob> {
        self.jobs.list().await
    }

    // ==================== Run loop ====================

    async fn run(
        &self,
        protocol: &ProtocolDefinition,
        variables: Map<String, Value>,
        observer: &dyn ExecutionObserver,
        job: Option<&JobId>,
    ) -> RunResult {
        let name = protocol.name();
        let mut state = ExecutionState::new(&protocol.variables, variables);
        info!(protocol = %name, phases = protocol.phases.len(), "Running protocol");
        observer.on_run_start(name, protocol.step_count());

        let total = protocol.phases.len();
        for (index, phase) in protocol.phases.iter().enumerate() {
            debug!(phase = %phase.name, "Phase start");
            observer.on_phase_start(&phase.name, index, total);

            if let Err(failure) = self.run_phase(phase, &mut state, observer, job).await {
                warn!(protocol = %name, error = %failure, "Protocol run failed");
                let result = state.finish(name, Some(failure.to_string()));
                observer.on_run_complete(&result);
                return result;
            }

            state.complete_phase();
            observer.on_phase_complete(&phase.name);
            self.publish_progress(job, &state).await;
        }

        let result = state.finish(name, None);
        info!(
            protocol = %name,
            steps = result.steps_completed,
            skipped = result.skipped_steps.len(),
            "Protocol run completed"
        );
        observer.on_run_complete(&result);
        result
    }

    async fn run_phase(
        &self,
        phase: &Phase,
        state: &mut ExecutionState,
        observer: &dyn ExecutionObserver,
        job: Option<&JobId>,
    ) -> Result<(), StepFailure> {
        for step in &phase.steps {
            observer.on_step_start(&phase.name, &step.name, &step.tool);

            match self.run_step(phase, step, state, observer).await {
                Ok(value) => {
                    state.record_success(step.output_key.as_deref(), value);
                    observer.on_step_complete(&step.name);
                }
                Err(failure) => {
                    observer.on_step_failed(&step.name, failure.policy, &failure.source);
                    if failure.policy != ErrorPolicy::Continue {
                        return Err(failure);
                    }
                    warn!(step = %step.name, error = %failure.source, "Step failed, continuing");
                    state.record_skip(&phase.name, &step.name, failure.source.to_string());
                }
            }

            self.publish_progress(job, state).await;
        }
        Ok(())
    }

    /// Render and dispatch one step, retrying when its policy allows.
    async fn run_step(
        &self,
        phase: &Phase,
        step: &Step,
        state: &ExecutionState,
        observer: &dyn ExecutionObserver,
    ) -> Result<Value, StepFailure> {
        let arguments = interpolation::render(&step.arguments, state.variables(), state.results());
        let max_attempts = step.max_attempts();
        let mut attempt = 1;

        loop {
            debug!(step = %step.name, tool = %step.tool, attempt, "Dispatching step");
            let error = match self
                .dispatcher
                .dispatch(&self.params.agent, &step.tool, arguments.clone())
                .await
            {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= max_attempts || !error.is_retryable() {
                return Err(StepFailure {
                    phase: phase.name.clone(),
                    step: step.name.clone(),
                    policy: step.on_error,
                    attempts: attempt,
                    source: error,
                });
            }

            let delay = self.params.retry_delay(attempt);
            warn!(
                step = %step.name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Step failed, retrying"
            );
            observer.on_step_retry(&step.name, attempt, delay, &error);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn publish_progress(&self, job: Option<&JobId>, state: &ExecutionState) {
        if let Some(id) = job {
            self.jobs.update(id, |job| job.update_progress(state)).await;
        }
    }
}
