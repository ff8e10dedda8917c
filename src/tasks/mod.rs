// ABOUTME: Pipeline task kinds parsed from the task file, one handler per kind.
// ABOUTME: Unknown kinds fail at parse time; each handler opens its own Engine session.

mod build;
mod compose;
mod container;
mod image;
mod prune;
mod push;

pub use build::BuildTask;
pub use compose::{ComposeTask, compose_args};
pub use container::{RmTask, StopTask};
pub use image::{ImageCommand, ImageTask, PullTask, TagTask, pull_reference};
pub use prune::PruneTask;
pub use push::PushTask;

use crate::engine::{Connector, PruneReport};
use crate::error::Result;
use crate::pipeline::{BuildResult, PushReport, Workspace};
use serde::{Deserialize, Serialize};

/// A single pipeline step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Task {
    Build(BuildTask),
    Push(PushTask),
    Pull(PullTask),
    Tag(TagTask),
    Image(ImageTask),
    Rm(RmTask),
    Prune(PruneTask),
    Stop(StopTask),
    Compose(ComposeTask),
}

/// What a task produced.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskOutput {
    Build(BuildResult),
    Push(PushReport),
    Pull { image: String },
    Tag { source: String, target: String },
    Image { command: ImageCommand, source: String },
    Rm { containers: Vec<String>, images: Vec<String> },
    Prune(PruneReport),
    Stop { container: String, killed: bool, deleted: bool },
    Compose { exit_code: i32 },
}

impl Task {
    /// Kind name as written in the task file.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Build(_) => "build",
            Task::Push(_) => "push",
            Task::Pull(_) => "pull",
            Task::Tag(_) => "tag",
            Task::Image(_) => "image",
            Task::Rm(_) => "rm",
            Task::Prune(_) => "prune",
            Task::Stop(_) => "stop",
            Task::Compose(_) => "compose",
        }
    }

    pub async fn run<C: Connector>(
        &self,
        workspace: &Workspace<'_>,
        connector: &C,
    ) -> Result<TaskOutput> {
        match self {
            Task::Build(task) => task.run(workspace, connector).await,
            Task::Push(task) => task.run(workspace, connector).await,
            Task::Pull(task) => task.run(connector).await,
            Task::Tag(task) => task.run(connector).await,
            Task::Image(task) => task.run(connector).await,
            Task::Rm(task) => task.run(connector).await,
            Task::Prune(task) => task.run(connector).await,
            Task::Stop(task) => task.run(connector).await,
            Task::Compose(task) => task.run(workspace, connector).await,
        }
    }
}
