// ABOUTME: Image operations trait for the Docker Engine.
// ABOUTME: Build, push, pull (streamed), plus tag and remove.

use super::shared_types::{BuildSpec, EventStream, RegistryAuth};
use crate::types::ImageReference;
use async_trait::async_trait;

/// Image operations.
///
/// Long-running operations hand back their raw event stream; the caller
/// decides how to consume it.
#[async_trait]
pub trait ImageOps: Send + Sync {
    /// Start a build from a tar context.
    fn build_image(&self, spec: BuildSpec) -> EventStream;

    /// Start pushing `reference` to its registry.
    fn push_image(&self, reference: &ImageReference, auth: Option<&RegistryAuth>) -> EventStream;

    /// Start pulling `image` from its registry.
    fn pull_image(&self, image: &str, auth: Option<&RegistryAuth>) -> EventStream;

    /// Add `target` as a name for the existing image `source`.
    async fn tag_image(&self, source: &str, target: &ImageReference) -> Result<(), ImageError>;

    /// Remove an image by name or ID.
    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("image in use, cannot remove: {0}")]
    InUse(String),

    #[error("failed to tag {source_image} as {target}: {message}")]
    TagFailed {
        source_image: String,
        target: String,
        message: String,
    },

    #[error("runtime error: {0}")]
    Runtime(String),
}
