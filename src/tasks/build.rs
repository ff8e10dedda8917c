// ABOUTME: The build task: renders its settings into a BuildRequest and runs the build pipeline.
// ABOUTME: Pushes afterwards when `push` is set.

use super::TaskOutput;
use crate::config::{EnvValue, one_or_many, resolve_env_map};
use crate::engine::Connector;
use crate::error::Result;
use crate::pipeline::{BuildRequest, Workspace, run_build};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct BuildTask {
    /// Inline Dockerfile, path under the working directory, or `storage://` URI.
    pub dockerfile: String,

    #[serde(default, deserialize_with = "one_or_many")]
    pub tags: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub platforms: Vec<String>,

    #[serde(default)]
    pub build_args: HashMap<String, EnvValue>,

    #[serde(default)]
    pub labels: HashMap<String, EnvValue>,

    #[serde(default = "default_pull")]
    pub pull: bool,

    #[serde(default)]
    pub push: bool,
}

fn default_pull() -> bool {
    true
}

impl BuildTask {
    pub fn to_request(&self) -> Result<BuildRequest> {
        Ok(BuildRequest {
            dockerfile: self.dockerfile.clone(),
            platforms: self.platforms.clone(),
            tags: self.tags.clone(),
            build_args: resolve_env_map(&self.build_args)?,
            labels: resolve_env_map(&self.labels)?,
            pull: self.pull,
            push: self.push,
        })
    }

    pub async fn run<C: Connector>(
        &self,
        workspace: &Workspace<'_>,
        connector: &C,
    ) -> Result<TaskOutput> {
        let request = self.to_request()?;
        let result = run_build(&request, workspace, |target| connector.open(Some(target))).await?;
        Ok(TaskOutput::Build(result))
    }
}
