// ABOUTME: One-shot container tasks: rm (containers then images) and stop.
// ABOUTME: Single Engine calls, no streaming and no registry scope.

use super::TaskOutput;
use crate::config::one_or_many;
use crate::engine::{Connector, ContainerOps, ImageOps};
use crate::error::Result;
use crate::types::ContainerId;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RmTask {
    #[serde(default, deserialize_with = "one_or_many")]
    pub container_ids: Vec<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub image_ids: Vec<String>,

    /// Also remove the containers' anonymous volumes.
    #[serde(default)]
    pub remove_volumes: bool,

    #[serde(default)]
    pub force: bool,
}

impl RmTask {
    pub async fn run<C: Connector>(&self, connector: &C) -> Result<TaskOutput> {
        let session = connector.open(None)?;
        let engine = session.engine();

        for id in &self.container_ids {
            tracing::info!(container = %id, "removing container");
            engine
                .remove_container(&ContainerId::new(id.clone()), self.force, self.remove_volumes)
                .await?;
        }

        for id in &self.image_ids {
            tracing::info!(image = %id, "removing image");
            engine.remove_image(id, self.force).await?;
        }

        Ok(TaskOutput::Rm {
            containers: self.container_ids.clone(),
            images: self.image_ids.clone(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopTask {
    pub container_id: String,

    /// Send SIGKILL instead of a graceful stop.
    #[serde(default)]
    pub kill: bool,

    /// Remove the container once stopped.
    #[serde(default = "default_delete")]
    pub delete: bool,
}

fn default_delete() -> bool {
    true
}

impl StopTask {
    pub async fn run<C: Connector>(&self, connector: &C) -> Result<TaskOutput> {
        let session = connector.open(None)?;
        let engine = session.engine();
        let id = ContainerId::new(self.container_id.trim().to_string());

        if self.kill {
            tracing::info!(container = %id, "killing container");
            engine.kill_container(&id).await?;
        } else {
            tracing::info!(container = %id, "stopping container");
            engine.stop_container(&id).await?;
        }

        if self.delete {
            engine.remove_container(&id, false, false).await?;
            tracing::info!(container = %id, "removed container");
        }

        Ok(TaskOutput::Stop {
            container: id.into_inner(),
            killed: self.kill,
            deleted: self.delete,
        })
    }
}
