// ABOUTME: Validated domain types shared by the pipeline and task layers.
// ABOUTME: Image references, tag sets, and phantom-typed Engine identifiers.

mod id;
mod image_ref;
mod tag_set;

pub use id::{ContainerId, Id, ImageId};
pub use image_ref::{
    DEFAULT_REGISTRY, DEFAULT_TAG, ImageReference, ParseImageRefError, remove_scheme,
    split_repo_tag,
};
pub use tag_set::{TagSet, TagSetError};
