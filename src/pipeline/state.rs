// ABOUTME: Build pipeline state marker types for the type state pattern.
// ABOUTME: A pipeline can only push or finish once it carries a built image ID.

use crate::types::ImageId;

/// Tags normalized, Dockerfile located, session open.
/// Available actions: `build()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Prepared;

/// Build succeeded and every tag points at the image.
/// Available actions: `push()`, `finish()`
#[derive(Debug, Clone)]
pub struct Built {
    pub(crate) image_id: ImageId,
}

impl Built {
    pub fn image_id(&self) -> &ImageId {
        &self.image_id
    }
}
