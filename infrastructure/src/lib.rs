//! Infrastructure layer for toolmesh
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the remote provider connection manager,
//! built-in local functions, protocol file loading and configuration.

pub mod builtin;
pub mod config;
pub mod protocol_loader;
pub mod remote;

// Re-export commonly used types
pub use builtin::builtin_registry;
pub use config::{
    ConfigError, ConfigLoader, ConfigValidationError, FileAgentConfig, FileConfig,
    FileProviderConfig,
};
pub use protocol_loader::{ProtocolFormat, ProtocolLoadError, ProtocolLoader};
pub use remote::{
    ConnectionManager, HealthSettings, HttpTransportFactory, McpTransport, RemoteError,
    TransportFactory,
};
