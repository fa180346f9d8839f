//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,

    /// Serve files already present in the thumbnail root directly,
    /// so only misses reach the generator.
    pub serve_static: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            serve_static: true,
        }
    }
}

/// Keyed-hash algorithm used for URL signatures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// HMAC-MD5, compatible with previously issued URLs
    #[default]
    Md5,
    /// HMAC-SHA256
    Sha256,
}

/// URL signing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared secret. May be a `${ENV_VAR}` reference.
    pub secret_key: String,

    /// Digest behind the HMAC
    pub algorithm: SignatureAlgorithm,
}

impl SigningConfig {
    /// Resolve the secret, following a `${ENV_VAR}` reference if present.
    ///
    /// Returns `None` if the secret is empty or the variable is unset.
    pub fn resolved_secret(&self) -> Option<String> {
        resolve_env_var(&self.secret_key)
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding source images (`{id}_{hash}.{ext}`)
    pub image_root: PathBuf,

    /// Directory thumbnails are written to
    pub thumb_root: PathBuf,

    /// Placeholder image used when a source cannot be loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dummy: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_root: PathBuf::from("./images"),
            thumb_root: PathBuf::from("./thumbs"),
            dummy: None,
        }
    }
}

/// Resource limits to protect against problematic requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest width or height a request may ask for
    pub max_dimension: u32,

    /// Deadline for load + resize + save, in milliseconds
    pub resize_timeout_ms: u64,

    /// Renders allowed to run at once; further requests queue for a slot
    pub max_concurrent_renders: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_dimension: 4096,
            resize_timeout_ms: 10_000,
            max_concurrent_renders: 4,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
