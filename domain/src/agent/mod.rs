//! Agent domain module
//!
//! An agent is a named identity with a granted set of callable tools. This
//! module holds the pure capability data the router consults on every call:
//! local functions, delegate targets, and remote-provider grants.

pub mod capabilities;

pub use capabilities::{AgentCapabilities, CapabilityRegistry, RemoteGrants};
