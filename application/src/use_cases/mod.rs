//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod job_store;
pub mod protocol_executor;
pub mod tool_router;
