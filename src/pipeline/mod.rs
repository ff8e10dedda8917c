// ABOUTME: Build-and-publish pipelines driving the Engine through streamed operations.
// ABOUTME: Exposes the typestate build pipeline, the fail-fast push pipeline and their errors.

mod build;
mod error;
mod push;
mod state;

pub use build::{BuildPipeline, BuildRequest, BuildResult, CONTEXT_DOCKERFILE, run_build};
pub use error::{PipelineError, PipelineErrorKind};
pub use push::{PushReport, push_tags, run_push};
pub use state::{Built, Prepared};

use crate::locator::BlobStore;
use crate::metrics::MetricsRecorder;
use std::path::Path;
use std::sync::Arc;

/// Collaborators a pipeline step runs against.
#[derive(Clone)]
pub struct Workspace<'a> {
    /// Directory relative file inputs resolve against and the build context root.
    pub working_dir: &'a Path,
    pub store: &'a dyn BlobStore,
    pub metrics: Option<Arc<dyn MetricsRecorder>>,
}
