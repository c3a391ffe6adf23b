//! Application layer for toolmesh
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{ExecutionParams, JobRetention, RouterParams};
pub use ports::{
    agent_runtime::AgentRuntime,
    execution_observer::{ExecutionObserver, NoObserver},
    local_function::{LocalFunction, LocalFunctionRegistry},
    remote_gateway::{NoRemoteTools, RemoteToolGateway},
    tool_dispatcher::ToolDispatcher,
};
pub use use_cases::job_store::JobStore;
pub use use_cases::protocol_executor::{ExecutorError, ProtocolExecutor, StepFailure};
pub use use_cases::tool_router::ToolRouter;
