// ABOUTME: Application-wide error types for dockhand.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::engine::{ConnectError, ContainerError, ImageError, PruneError};
use crate::locator::LocateError;
use crate::pipeline::PipelineError;
use crate::types::ParseImageRefError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("task file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid image reference: {0}")]
    InvalidReference(#[from] ParseImageRefError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Prune(#[from] PruneError),

    #[error("pull of {image} failed: {message}")]
    Pull { image: String, message: String },

    #[error("task '{task}' failed: {source}")]
    Task {
        task: String,
        #[source]
        source: Box<Error>,
    },

    #[error("docker compose exited with {status}")]
    Compose { status: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
