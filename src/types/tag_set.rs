// ABOUTME: Non-empty, duplicate-free set of normalized image references.
// ABOUTME: Iterates in first-insertion order so the first tag is stable.

use super::image_ref::{ImageReference, ParseImageRefError};
use nonempty::NonEmpty;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagSetError {
    #[error("at least one tag must be provided")]
    Empty,

    #[error("invalid tag {tag:?}: {source}")]
    Invalid {
        tag: String,
        source: ParseImageRefError,
    },
}

/// Tags an image is built under or pushed as.
///
/// Every entry has had its scheme stripped and parsed as a reference.
/// Entries that normalize to the same reference collapse into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet(NonEmpty<ImageReference>);

impl TagSet {
    pub fn new<I, S>(tags: I) -> Result<Self, TagSetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<ImageReference> = Vec::new();
        for raw in tags {
            let raw = raw.as_ref();
            let reference = ImageReference::parse(raw).map_err(|source| TagSetError::Invalid {
                tag: raw.to_string(),
                source,
            })?;
            if !unique.contains(&reference) {
                unique.push(reference);
            }
        }

        NonEmpty::from_vec(unique)
            .map(Self)
            .ok_or(TagSetError::Empty)
    }

    /// The tag used to scope the Engine connection and name the build.
    pub fn first(&self) -> &ImageReference {
        self.0.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageReference> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
