//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_dimension must be > 0".into(),
            ));
        }
        if self.limits.resize_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.resize_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.max_concurrent_renders == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_concurrent_renders must be > 0".into(),
            ));
        }
        if self.storage.image_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.image_root must not be empty".into(),
            ));
        }
        if self.storage.thumb_root.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.thumb_root must not be empty".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}
