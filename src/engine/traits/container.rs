// ABOUTME: Container operations trait for the Docker Engine.
// ABOUTME: Stop, kill and remove containers by ID.

use crate::types::ContainerId;
use async_trait::async_trait;

/// Container lifecycle operations used by the stop and rm tasks.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// Gracefully stop a running container.
    async fn stop_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Send SIGKILL to a running container.
    async fn kill_container(&self, id: &ContainerId) -> Result<(), ContainerError>;

    /// Remove a container, optionally with its anonymous volumes.
    async fn remove_container(
        &self,
        id: &ContainerId,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), ContainerError>;
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("container conflict: {0}")]
    Conflict(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
