//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! implement.

pub mod agent_runtime;
pub mod execution_observer;
pub mod local_function;
pub mod remote_gateway;
pub mod tool_dispatcher;
