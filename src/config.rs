//! Configuration Management
//!
//! Handles persistent configuration storage for leshan-rest.

use crate::leshan::DEFAULT_TIMEOUT;
use crate::topology::default_cache_dir;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Leshan server base URL
    #[serde(default)]
    pub server_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// Where topology snapshots are cached
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Folder of XML object definitions used instead of server discovery
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("leshan-rest").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path; missing or malformed files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective server URL (CLI > config)
    pub fn effective_server(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.server_url.clone())
    }

    /// Get effective timeout (CLI > config > 4s)
    pub fn effective_timeout(&self, cli_secs: Option<f64>) -> Duration {
        cli_secs
            .or(self.timeout_secs)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Get effective cache directory (CLI > config > user cache dir)
    pub fn effective_cache_dir(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.cache_dir.clone())
            .unwrap_or_else(default_cache_dir)
    }

    /// Get effective models folder (CLI > config)
    pub fn effective_models_dir(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.models_dir.clone())
    }

    /// Set server and save to `path`
    pub fn set_server(&mut self, url: &str, path: &Path) -> Result<()> {
        self.server_url = Some(url.to_string());
        self.save_to(path)
    }
}
