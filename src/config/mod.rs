/// Configuration management for the task board server
///
/// Handles server bind settings and the storage directory layout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Storage layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for all board data (default: "data")
    pub data_dir: PathBuf,
    /// Directory holding workflow definitions, `.acl.json` and `.audit.jsonl`
    /// (default: "{data_dir}/workflows")
    pub workflows_dir: PathBuf,
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl Config {
    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| "data".to_string()));
        let workflows_dir = lookup("TASKBOARD_WORKFLOWS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("workflows"));

        Self {
            server: ServerConfig {
                host: lookup("TASKBOARD_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: lookup("TASKBOARD_PORT")
                    .and_then(|port| port.parse().ok())
                    .unwrap_or(3001),
            },
            storage: StorageConfig {
                data_dir,
                workflows_dir,
            },
        }
    }
}
