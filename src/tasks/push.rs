// ABOUTME: The push task: pushes already-built tags through the push pipeline.
// ABOUTME: Stops at the first tag the registry rejects.

use super::TaskOutput;
use crate::config::one_or_many;
use crate::engine::Connector;
use crate::error::Result;
use crate::pipeline::{Workspace, run_push};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PushTask {
    #[serde(default, deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
}

impl PushTask {
    pub async fn run<C: Connector>(
        &self,
        workspace: &Workspace<'_>,
        connector: &C,
    ) -> Result<TaskOutput> {
        let report = run_push(&self.tags, workspace.metrics.clone(), |target| {
            connector.open(Some(target))
        })
        .await?;
        Ok(TaskOutput::Push(report))
    }
}
