//! Remote provider domain types
//!
//! The connection manager that owns live sessions lives in the
//! infrastructure layer; only the pure descriptors live here.

pub mod provider;

pub use provider::{ProviderConfig, ProviderHealth, TransportKind};
