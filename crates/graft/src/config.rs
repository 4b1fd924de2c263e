use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use graft_core::kernel::constants::DEFAULT_NAMESPACES;
use graft_core::{ConflictStrategy, Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }

    /// Deserialize from string based on format
    pub fn deserialize<T: DeserializeOwned>(&self, data: &str) -> std::result::Result<T, String> {
        match self {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| e.to_string()),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| e.to_string()),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| e.to_string()),
        }
    }
}

/// Read and parse a JSON / YAML / TOML file, picking the format by extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| Error::Config {
        path: path.to_path_buf(),
        message: "unknown or unsupported file format".to_string(),
        source: None,
    })?;
    let data = std::fs::read_to_string(path).map_err(|e| Error::config(path, "failed to read file", e))?;
    format
        .deserialize(&data)
        .map_err(|e| Error::config(path, format!("failed to parse {:?} file", format), e))
}

/// Host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Namespaces created in the shared context before plugins run
    pub namespaces: Vec<String>,
    /// Log level used unless RUST_LOG is set
    pub log_level: String,
    /// Strategy for batch entries that do not declare one
    pub default_conflict_strategy: ConflictStrategy,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            namespaces: DEFAULT_NAMESPACES.iter().map(|s| s.to_string()).collect(),
            log_level: "info".to_string(),
            default_conflict_strategy: ConflictStrategy::default(),
        }
    }
}

impl HostConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => load_file(path),
            None => Ok(Self::default()),
        }
    }
}
