// ABOUTME: Build orchestration from a located Dockerfile to a tagged image, optionally pushed.
// ABOUTME: Typestate pipeline: Prepared -> Built -> (push | finish).

use super::error::PipelineError;
use super::push::{PushReport, push_tags};
use super::state::{Built, Prepared};
use super::Workspace;
use crate::engine::{BuildSpec, ConnectError, Engine, EngineSession};
use crate::locator::{DOCKERFILE_SUFFIX, FileLocator};
use crate::metrics::MetricsRecorder;
use crate::sink::{CallbackSink, SinkMode, pump};
use crate::types::{ImageId, ImageReference, TagSet};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Entry name the resolved Dockerfile is stored under in the build context.
pub const CONTEXT_DOCKERFILE: &str = ".dockhand.Dockerfile";

/// Input to one build.
///
/// | field        | effect when empty/false                  |
/// |--------------|------------------------------------------|
/// | `platforms`  | Engine default platform                  |
/// | `build_args` | no build args sent                       |
/// | `labels`     | no labels sent                           |
/// | `pull`       | cached base images are used              |
/// | `push`       | pipeline ends after the build            |
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Inline Dockerfile, path relative to the working directory, or `storage://` URI.
    pub dockerfile: String,
    pub platforms: Vec<String>,
    pub tags: Vec<String>,
    pub build_args: HashMap<String, String>,
    pub labels: HashMap<String, String>,
    pub pull: bool,
    pub push: bool,
}

/// Output of a successful build pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub image_id: ImageId,
    /// Present when the pipeline also pushed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushReport>,
}

/// A build in progress, parameterized by its current state.
pub struct BuildPipeline<'s, E: Engine, S> {
    session: &'s EngineSession<E>,
    tags: TagSet,
    state: S,
}

impl<'s, E: Engine> BuildPipeline<'s, E, Prepared> {
    pub fn new(session: &'s EngineSession<E>, tags: TagSet) -> Self {
        Self {
            session,
            tags,
            state: Prepared,
        }
    }

    /// Run the build and apply every tag to the resulting image.
    pub async fn build(
        self,
        request: &BuildRequest,
        dockerfile: &Path,
        context_dir: &Path,
    ) -> Result<BuildPipeline<'s, E, Built>, PipelineError> {
        let first = self.tags.first().clone();
        let context = archive_context(context_dir.to_path_buf(), dockerfile.to_path_buf()).await?;

        let spec = BuildSpec {
            context,
            dockerfile: CONTEXT_DOCKERFILE.to_string(),
            tag: first.to_string(),
            pull: request.pull,
            platform: join_platforms(&request.platforms),
            build_args: request.build_args.clone(),
            labels: request.labels.clone(),
        };
        tracing::info!(tag = %first, ?spec, "building image");

        let failed = |message: String| PipelineError::Build {
            tag: first.to_string(),
            message,
        };

        let sink = Arc::new(CallbackSink::new(SinkMode::Build));
        let stream = self.session.engine().build_image(spec);
        pump(Arc::clone(&sink), stream)
            .await
            .map_err(|e| failed(format!("event stream task failed: {e}")))?;
        sink.await_completion().await;
        sink.outcome().map_err(|e| failed(e.to_string()))?;

        let image_id = sink
            .image_id()
            .map(|id| ImageId::new(id.to_string()))
            .ok_or_else(|| PipelineError::NoImageId(first.to_string()))?;

        for tag in self.tags.iter().skip(1) {
            self.session
                .engine()
                .tag_image(image_id.as_str(), tag)
                .await
                .map_err(PipelineError::Tag)?;
            tracing::debug!(tag = %tag, "applied tag");
        }

        tracing::info!(image = image_id.short(), "build complete");
        Ok(BuildPipeline {
            session: self.session,
            tags: self.tags,
            state: Built { image_id },
        })
    }
}

impl<'s, E: Engine> BuildPipeline<'s, E, Built> {
    pub fn image_id(&self) -> &ImageId {
        self.state.image_id()
    }

    /// Push every tag. Any failure fails the whole pipeline and drops the image ID.
    pub async fn push(
        self,
        metrics: Option<Arc<dyn MetricsRecorder>>,
    ) -> Result<BuildResult, PipelineError> {
        let report = push_tags(self.session, &self.tags, metrics).await?;
        Ok(BuildResult {
            image_id: self.state.image_id,
            push: Some(report),
        })
    }

    /// End the pipeline without pushing.
    pub fn finish(self) -> BuildResult {
        BuildResult {
            image_id: self.state.image_id,
            push: None,
        }
    }
}

/// Run a build request end to end.
///
/// Tags are normalized and the Dockerfile located before `open` is called,
/// so configuration errors never reach the Engine. The Engine is pinged
/// before the build starts. The session is scoped to the first tag's
/// registry and dropped on every exit path.
pub async fn run_build<E, F>(
    request: &BuildRequest,
    workspace: &Workspace<'_>,
    open: F,
) -> Result<BuildResult, PipelineError>
where
    E: Engine,
    F: FnOnce(&ImageReference) -> Result<EngineSession<E>, ConnectError>,
{
    let tags = TagSet::new(&request.tags)?;
    let locator = FileLocator::new(workspace.working_dir, workspace.store);
    let dockerfile = locator
        .resolve(&request.dockerfile, DOCKERFILE_SUFFIX)
        .await?;

    let session = open(tags.first())?;
    session.ping().await?;
    let built = BuildPipeline::new(&session, tags)
        .build(request, dockerfile.path(), workspace.working_dir)
        .await?;

    if request.push {
        built.push(workspace.metrics.clone()).await
    } else {
        Ok(built.finish())
    }
}

fn join_platforms(platforms: &[String]) -> Option<String> {
    let joined = platforms
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    (!joined.is_empty()).then_some(joined)
}

/// Tar `context_dir` and append the Dockerfile under [`CONTEXT_DOCKERFILE`].
async fn archive_context(context_dir: PathBuf, dockerfile: PathBuf) -> Result<Vec<u8>, PipelineError> {
    let path = context_dir.clone();
    let io_err = move |source| PipelineError::Context {
        path: path.clone(),
        source,
    };

    tokio::task::spawn_blocking(move || build_context_tar(&context_dir, &dockerfile))
        .await
        .map_err(|e| io_err(std::io::Error::other(e)))?
        .map_err(io_err)
}

fn build_context_tar(context_dir: &Path, dockerfile: &Path) -> std::io::Result<Vec<u8>> {
    let mut ar = tar::Builder::new(Vec::new());
    ar.follow_symlinks(false);
    ar.append_dir_all(".", context_dir)?;

    let content = std::fs::read(dockerfile)?;
    let mut header = tar::Header::new_gnu();
    header.set_path(CONTEXT_DOCKERFILE)?;
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    ar.append(&header, content.as_slice())?;

    ar.into_inner()
}
