//! Domain layer for toolmesh
//!
//! Pure types with no I/O: who may call what, how flat tool names map onto
//! the three call kinds, what a remote provider looks like, and what a
//! protocol run consists of.
//!
//! # Core Concepts
//!
//! ## Capabilities
//!
//! Every agent carries a set of local functions, delegate targets and
//! remote-provider grants ([`AgentCapabilities`]). The router consults
//! them on every call; nothing here performs a call.
//!
//! ## Flat tool names
//!
//! All three kinds share one namespace:
//!
//! - `delegate_to_<agent>` names a delegation
//! - `<provider>_<tool>` names a remote tool
//! - bare names are local functions
//!
//! ## Protocols
//!
//! A [`ProtocolDefinition`] is an ordered list of phases of steps. Step
//! arguments are templates rendered by [`protocol::interpolation::render`].

pub mod agent;
pub mod core;
pub mod protocol;
pub mod remote;
pub mod tool;

// Re-export commonly used types
pub use agent::{AgentCapabilities, CapabilityRegistry, RemoteGrants};
pub use protocol::{
    ErrorPolicy, ExecutionState, JobId, Phase, ProtocolDefinition, ProtocolJob, ProtocolMetadata,
    RunResult, RunStatus, SkippedStep, Step, ValidationError,
};
pub use remote::{ProviderConfig, ProviderHealth, TransportKind};
pub use tool::{
    DELEGATION_PREFIX, ToolDescriptor, ToolError, ToolReference, delegation_target,
    delegation_tool_name, flat_tool_name, strip_provider_prefix,
};
