//! Deployment extension points around thumbnail generation.

use async_trait::async_trait;
use image::DynamicImage;
use std::path::Path;

use crate::error::RequestResult;
use crate::types::TransformDescriptor;

/// Hooks run by the resolver around each generated thumbnail.
///
/// Both default to no-ops. An `Err` from either hook fails the request
/// like any other pipeline error. Uses `async_trait` because the resolver
/// holds hooks as `Arc<dyn ThumbnailHooks>`.
#[async_trait]
pub trait ThumbnailHooks: Send + Sync {
    /// Called with a verified descriptor before the source is opened.
    async fn pre(&self, _descriptor: &TransformDescriptor) -> RequestResult<()> {
        Ok(())
    }

    /// Called after the thumbnail has been persisted at `destination`.
    async fn post(
        &self,
        _descriptor: &TransformDescriptor,
        _thumbnail: &DynamicImage,
        _destination: &Path,
    ) -> RequestResult<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl ThumbnailHooks for NoopHooks {}
