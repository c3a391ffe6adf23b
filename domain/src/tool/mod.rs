//! Tool domain module
//!
//! Defines the flat naming scheme that lets an agent reach three kinds of
//! capability through one string, and the closed [`ToolReference`] type a
//! name resolves to.
//!
//! # Naming convention
//!
//! ```text
//! echo                     → LocalFunction { name: "echo" }
//! delegate_to_researcher   → Delegation { target_agent: "researcher" }
//! github_search_issues     → RemoteTool { provider: "github", original_name: "search_issues" }
//! ```
//!
//! Remote tool lists are rewritten to the `provider_tool` form when a
//! provider connects, which keeps the namespace collision-free across
//! providers. The router's resolution order depends on this convention.
//!
//! # Key Types
//!
//! - [`ToolReference`] - resolved dispatch target
//! - [`ToolDescriptor`] - catalog entry (name, description, JSON Schema)
//! - [`ToolError`] - dispatch error taxonomy with retry classification

pub mod entities;
pub mod error;

pub use entities::{
    DELEGATION_PREFIX, ToolDescriptor, ToolReference, delegation_target, delegation_tool_name,
    flat_tool_name, strip_provider_prefix,
};
pub use error::ToolError;
