//! Application-level configuration.
//!
//! - [`RouterParams`] - delegation depth and tool-call timeout
//! - [`ExecutionParams`] - protocol executor identity, retry pacing, job retention

pub mod execution_params;
pub mod router_params;

pub use execution_params::{ExecutionParams, JobRetention};
pub use router_params::RouterParams;
