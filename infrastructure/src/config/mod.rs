//! Configuration file loading for toolmesh
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLMESH_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolmesh.toml` or `./.toolmesh.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/toolmesh/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileExecutorConfig, FileHealthConfig,
    FileProviderConfig, FileRouterConfig,
};
pub use loader::{ConfigError, ConfigLoader};
