//! Protocol definition loader
//!
//! Reads protocol documents from the local file system and validates them into
//! [`ProtocolDefinition`]s.
//!
//! # Lookup
//!
//! A reference is either a path to an existing file, or a bare protocol name
//! resolved against the protocols directory by trying, in order:
//!
//! 1. `<dir>/<name>.yaml`
//! 2. `<dir>/<name>.yml`
//! 3. `<dir>/<name>.json`
//! 4. `<dir>/<name>.toml`
//!
//! # Example
//!
//! ```ignore
//! use toolmesh_infrastructure::ProtocolLoader;
//!
//! let loader = ProtocolLoader::new("protocols");
//! let protocol = loader.load("research")?;
//! println!("{} has {} steps", protocol.name(), protocol.step_count());
//! ```

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toolmesh_domain::{ProtocolDefinition, ValidationError};
use tracing::debug;

/// Extensions tried, in order, when resolving a protocol by name.
const EXTENSIONS: [&str; 4] = ["yaml", "yml", "json", "toml"];

#[derive(Debug, Error)]
pub enum ProtocolLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("protocol '{name}' not found in {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("unsupported protocol format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Document format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFormat {
    Yaml,
    Json,
    Toml,
}

impl ProtocolFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(ProtocolFormat::Yaml),
            "json" => Some(ProtocolFormat::Json),
            "toml" => Some(ProtocolFormat::Toml),
            _ => None,
        }
    }

    /// Parse a document into a JSON value tree.
    pub fn parse(&self, content: &str) -> Result<Value, String> {
        match self {
            ProtocolFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            ProtocolFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ProtocolFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        }
    }
}

/// Loads protocol definitions from the local file system.
#[derive(Debug, Clone)]
pub struct ProtocolLoader {
    protocols_dir: PathBuf,
}

impl ProtocolLoader {
    pub fn new(protocols_dir: impl Into<PathBuf>) -> Self {
        Self {
            protocols_dir: protocols_dir.into(),
        }
    }

    pub fn protocols_dir(&self) -> &Path {
        &self.protocols_dir
    }

    /// Load by path if `reference` names a file, otherwise by protocol name.
    pub fn load(&self, reference: &str) -> Result<ProtocolDefinition, ProtocolLoadError> {
        let path = Path::new(reference);
        if path.is_file() {
            return self.load_path(path);
        }
        self.load_by_name(reference)
    }

    pub fn load_by_name(&self, name: &str) -> Result<ProtocolDefinition, ProtocolLoadError> {
        let path = EXTENSIONS
            .iter()
            .map(|ext| self.protocols_dir.join(format!("{}.{}", name, ext)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| ProtocolLoadError::NotFound {
                name: name.to_string(),
                dir: self.protocols_dir.clone(),
            })?;
        self.load_path(&path)
    }

    pub fn load_path(&self, path: &Path) -> Result<ProtocolDefinition, ProtocolLoadError> {
        let format = ProtocolFormat::from_path(path)
            .ok_or_else(|| ProtocolLoadError::UnsupportedFormat(path.to_path_buf()))?;
        let content = fs::read_to_string(path).map_err(|source| ProtocolLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), ?format, "Loading protocol");

        let value = format
            .parse(&content)
            .map_err(|message| ProtocolLoadError::Parse {
                path: path.to_path_buf(),
                message,
            })?;
        Ok(ProtocolDefinition::from_value(value)?)
    }

    /// Names of every protocol file in the protocols directory, sorted.
    pub fn available(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.protocols_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && ProtocolFormat::from_path(path).is_some())
            .filter_map(|path| path.file_stem()?.to_str().map(str::to_string))
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
