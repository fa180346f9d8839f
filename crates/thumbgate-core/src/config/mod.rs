//! Configuration management for thumbgate.
//!
//! Configuration is read once at startup from a TOML file and is immutable
//! afterwards. Every struct implements `Default`, so a partial file is fine.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for thumbgate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Append error detail (padded) to 404 bodies
    pub debug: bool,

    /// HTTP server settings
    pub server: ServerConfig,

    /// URL signing settings
    pub signing: SigningConfig,

    /// Source, thumbnail and placeholder locations
    pub storage: StorageConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.thumbgate.thumbgate/config.toml
    /// - Linux: ~/.config/thumbgate/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\thumbgate\config\config.toml
    ///
    /// Falls back to ~/.thumbgate/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "thumbgate", "thumbgate")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".thumbgate").join("config.toml")
            })
    }

    /// Source image directory (with ~ expansion).
    pub fn image_root(&self) -> PathBuf {
        expand_path(&self.storage.image_root)
    }

    /// Thumbnail output directory (with ~ expansion).
    pub fn thumb_root(&self) -> PathBuf {
        expand_path(&self.storage.thumb_root)
    }

    /// Placeholder image path (with ~ expansion), if configured.
    pub fn dummy_path(&self) -> Option<PathBuf> {
        self.storage.dummy.as_deref().map(expand_path)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
