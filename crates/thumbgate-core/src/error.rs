//! Error types for the thumbgate request pipeline.
//!
//! Errors are organized by stage. Every request failure is a [`RequestError`];
//! the response mapper switches on its kind, and its `Display` text is the
//! detail shown in debug-mode 404 bodies.

use http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for thumbgate operations.
#[derive(Error, Debug)]
pub enum ThumbgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// No usable signing secret (empty, or an unset `${ENV_VAR}` reference)
    #[error("signing.secret_key is empty or references an unset environment variable")]
    MissingSecret,
}

/// Request errors, organized by pipeline stage.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The bare root path was requested. Not a failure; maps to 403.
    #[error("Root path requested")]
    RootPathRequested,

    /// The request URI does not follow the thumbnail grammar
    #[error("Malformed request: {reason}")]
    MalformedRequest { reason: String },

    /// Transform token is not in the allow-list
    #[error("Invalid image transform '{token}'")]
    UnsupportedTransform { token: String },

    /// Signature does not match the one derived from the descriptor
    #[error("Invalid signature")]
    InvalidSignature,

    /// Source image missing or undecodable, and no usable placeholder
    #[error("Source unavailable for {path}: {message}")]
    SourceUnavailable { path: PathBuf, message: String },

    /// Codec failure while resizing or persisting the thumbnail
    #[error("Resize or save failed for {path}: {message}")]
    ResizeOrSaveFailure { path: PathBuf, message: String },

    /// A pre/post hook refused the request
    #[error("{hook} hook rejected request: {message}")]
    HookRejected { hook: &'static str, message: String },

    /// Operation exceeded its deadline
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

impl RequestError {
    /// Shorthand for a [`RequestError::MalformedRequest`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// HTTP status this error surfaces as.
    ///
    /// Only the root path is distinguished; every other kind collapses to 404.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RootPathRequested => StatusCode::FORBIDDEN,
            _ => StatusCode::NOT_FOUND,
        }
    }

    /// Short stable name of the error kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RootPathRequested => "root_path",
            Self::MalformedRequest { .. } => "malformed_request",
            Self::UnsupportedTransform { .. } => "unsupported_transform",
            Self::InvalidSignature => "invalid_signature",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::ResizeOrSaveFailure { .. } => "resize_or_save_failure",
            Self::HookRejected { .. } => "hook_rejected",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Convenience type alias for thumbgate results.
pub type Result<T> = std::result::Result<T, ThumbgateError>;

/// Convenience type alias for request-pipeline results.
pub type RequestResult<T> = std::result::Result<T, RequestError>;
