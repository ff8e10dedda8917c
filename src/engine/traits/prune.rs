// ABOUTME: Prune operations trait for the Docker Engine.
// ABOUTME: Removes unused build cache, containers, images, networks or volumes.

use super::shared_types::{PruneFilters, PruneKind, PruneReport};
use async_trait::async_trait;

#[async_trait]
pub trait PruneOps: Send + Sync {
    /// Prune unused objects of one kind.
    async fn prune(&self, kind: PruneKind, filters: &PruneFilters)
    -> Result<PruneReport, PruneError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PruneError {
    #[error("a prune operation is already running")]
    AlreadyRunning,

    #[error("runtime error: {0}")]
    Runtime(String),
}
