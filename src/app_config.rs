//! Module for application configuration settings.
//!
//! User configurations may be specified in a configuration file.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

fn default_capacity() -> NonZeroUsize {
    media_scan::fs::meta_cache::CacheOptions::default().capacity
}

fn default_workers() -> NonZeroUsize {
    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// The cache configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Maximum live entries per cache table.
    #[serde(default = "default_capacity")]
    pub capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

/// The scan configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Number of scan worker threads.
    #[serde(default = "default_workers")]
    pub workers: NonZeroUsize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Application configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    /// Library roots to scan.
    #[serde(default)]
    pub libraries: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation errors: {0:?}")]
    ValidationErrors(Vec<String>),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for library in &self.libraries {
            if !library.is_absolute() {
                errors.push(format!(
                    "Library root '{}' is not an absolute path.",
                    library.display()
                ));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Returns config file paths in descending priority order.
    /// On macOS, skips `dirs::config_dir()` (resolves to ~/Library/Application Support/).
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join("media-scan").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("media-scan").join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/media-scan/config.toml"));

        paths
    }

    /// Finds the first existing config file from search paths.
    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from the first found config file, or the external
    /// path if given. Falls back to defaults when no file exists; errors if
    /// a file exists but is malformed.
    pub fn load_or_default(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match external_config_path {
            Some(path) => Some(Self::load_from_file(path)?),
            None => match Self::find_config_file() {
                Some(path) => Some(Self::load_from_file(&path)?),
                None => None,
            },
        };

        let config = loaded.unwrap_or_default();
        if let Err(validation_errors) = config.validate() {
            return Err(ConfigError::ValidationErrors(validation_errors));
        }
        debug!("Loaded configuration successfully.");
        Ok(config)
    }
}
