//! Remote tool providers
//!
//! Connects to external MCP providers over streamable HTTP or SSE, keeps
//! their tool lists and health, and serves as the production
//! [`RemoteToolGateway`](toolmesh_application::RemoteToolGateway).

pub mod error;
pub mod manager;
pub mod protocol;
pub mod transport;

pub use error::RemoteError;
pub use manager::{ConnectionManager, HealthSettings};
pub use transport::{HttpTransportFactory, McpTransport, TransportFactory};
