// ABOUTME: Error types for the build and push pipelines.
// ABOUTME: Each error classifies into a kind so callers can tell configuration from Engine failures.

use crate::engine::{ConnectError, ImageError};
use crate::locator::LocateError;
use crate::types::TagSetError;
use std::path::PathBuf;

/// Errors that end a build or push pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Tag list empty or a tag does not parse.
    #[error(transparent)]
    Tags(#[from] TagSetError),

    /// Dockerfile could not be located or materialized.
    #[error(transparent)]
    Locate(#[from] LocateError),

    /// Engine session could not be opened or credentials not resolved.
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Build context archive could not be assembled.
    #[error("failed to archive build context {path}: {source}")]
    Context {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The Engine reported a build failure.
    #[error("build of {tag} failed: {message}")]
    Build { tag: String, message: String },

    /// The build stream ended without announcing an image.
    #[error("build of {0} finished without reporting an image ID")]
    NoImageId(String),

    /// Applying an additional tag to the built image failed.
    #[error("failed to apply tag after build: {0}")]
    Tag(#[source] ImageError),

    /// Credentials for one tag's registry could not be resolved.
    #[error("credentials for {tag} unusable: {source}")]
    Credentials {
        tag: String,
        #[source]
        source: ConnectError,
    },

    /// The registry rejected a push.
    #[error("push of {tag} failed: {message}")]
    Push { tag: String, message: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// Detected before any Engine call.
    Configuration,
    /// Engine unreachable or credentials unusable.
    Connectivity,
    /// Blob store read or temporary file failure.
    Storage,
    /// Build failed; any requested push was skipped.
    Build,
    /// Registry push failed; remaining tags were not attempted.
    Push,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::Tags(_) => PipelineErrorKind::Configuration,
            PipelineError::Locate(LocateError::Missing) => PipelineErrorKind::Configuration,
            PipelineError::Locate(_) => PipelineErrorKind::Storage,
            PipelineError::Connect(_) | PipelineError::Credentials { .. } => {
                PipelineErrorKind::Connectivity
            }
            PipelineError::Context { .. } => PipelineErrorKind::Storage,
            PipelineError::Build { .. } | PipelineError::NoImageId(_) | PipelineError::Tag(_) => {
                PipelineErrorKind::Build
            }
            PipelineError::Push { .. } => PipelineErrorKind::Push,
        }
    }

    /// The tag a push failed on, including credential failures for that tag.
    pub fn failed_tag(&self) -> Option<&str> {
        match self {
            PipelineError::Push { tag, .. } | PipelineError::Credentials { tag, .. } => Some(tag),
            _ => None,
        }
    }
}
