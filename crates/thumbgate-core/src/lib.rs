//! Thumbgate Core - signed, on-demand thumbnail URLs.
//!
//! A thumbnail request carries everything needed to build it, plus a
//! truncated HMAC that stops clients from asking for arbitrary sizes:
//!
//! ```text
//! /4238_bpM4oOcw_150x200_s.jpg?ed0eee0cfa25309e40cc0d71
//!  id   hash     w   h   transform.ext ?signature
//! ```
//!
//! # Architecture
//!
//! ```text
//! URI → Decode → Verify signature → Resolve (load, fit, save) → 302 / 403 / 404
//! ```
//!
//! The first request for a URL generates the file and redirects back to the
//! same URL; from then on a static-file layer serves it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use thumbgate_core::{Config, Thumbgate};
//!
//! #[tokio::main]
//! async fn main() -> thumbgate_core::Result<()> {
//!     let config = Config::load()?;
//!     let gate = Thumbgate::new(config)?;
//!
//!     let response = gate.handle("/4238_bpM4oOcw_150x200_s.jpg?ed0eee0cfa25309e40cc0d71").await;
//!     println!("{} {:?}", response.status, response.location);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use config::{Config, SignatureAlgorithm};
pub use error::{ConfigError, RequestError, RequestResult, Result, ThumbgateError};
pub use pipeline::{
    ImageCodec, ImageCrateCodec, NoopHooks, RequestDecoder, ResolvedThumbnail, ResponseMapper,
    Signer, ThumbnailHooks, ThumbnailResolver, ThumbnailResponse,
};
pub use types::{Transform, TransformDescriptor};

use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The thumbnail endpoint: decoder, signer, resolver and mapper wired together.
///
/// Holds only read-only state, so one instance can serve concurrent requests
/// behind an `Arc`.
pub struct Thumbgate {
    config: Config,
    decoder: RequestDecoder,
    signer: Signer,
    resolver: ThumbnailResolver,
    mapper: ResponseMapper,
}

impl Thumbgate {
    /// Create an endpoint with the default codec and no-op hooks.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Start building an endpoint with custom collaborators.
    pub fn builder(config: Config) -> ThumbgateBuilder {
        ThumbgateBuilder {
            config,
            codec: Arc::new(ImageCrateCodec),
            hooks: Arc::new(NoopHooks),
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the signer, e.g. to mint URLs.
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Decode a request URI and check its signature, without touching disk.
    pub fn authenticate(&self, request_uri: &str) -> RequestResult<TransformDescriptor> {
        let descriptor = self.decoder.decode(request_uri)?;
        self.signer.verify(&descriptor)?;
        Ok(descriptor)
    }

    /// Run the full pipeline for a request URI.
    pub async fn process(&self, request_uri: &str) -> RequestResult<ResolvedThumbnail> {
        let descriptor = self.authenticate(request_uri)?;
        self.resolver.resolve(&descriptor).await
    }

    /// Handle a request URI (path + query) and produce its response.
    pub async fn handle(&self, request_uri: &str) -> ThumbnailResponse {
        let outcome = self.process(request_uri).await;
        match &outcome {
            Ok(resolved) => tracing::debug!("{} -> {:?}", request_uri, resolved.destination),
            Err(RequestError::RootPathRequested) => tracing::debug!("Root path requested"),
            Err(e) => tracing::debug!(kind = e.kind(), "{} rejected: {}", request_uri, e),
        }
        self.mapper.respond(request_uri, &outcome)
    }
}

/// Builder for [`Thumbgate`] with injectable codec and hooks.
pub struct ThumbgateBuilder {
    config: Config,
    codec: Arc<dyn ImageCodec>,
    hooks: Arc<dyn ThumbnailHooks>,
}

impl ThumbgateBuilder {
    /// Replace the image codec.
    pub fn codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Install pre/post generation hooks.
    pub fn hooks(mut self, hooks: Arc<dyn ThumbnailHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Build the endpoint. Fails if no signing secret can be resolved.
    pub fn build(self) -> Result<Thumbgate> {
        let secret = self
            .config
            .signing
            .resolved_secret()
            .ok_or(ConfigError::MissingSecret)?;
        let signer = Signer::new(secret.as_bytes(), self.config.signing.algorithm)?;

        tracing::debug!(
            "Initializing thumbgate v{} (images: {:?}, thumbs: {:?})",
            VERSION,
            self.config.image_root(),
            self.config.thumb_root()
        );

        Ok(Thumbgate {
            decoder: RequestDecoder::new(self.config.limits.clone()),
            signer,
            resolver: ThumbnailResolver::new(&self.config, self.codec, self.hooks),
            mapper: ResponseMapper::new(self.config.debug),
            config: self.config,
        })
    }
}
