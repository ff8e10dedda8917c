// ABOUTME: Engine info trait.
// ABOUTME: Query version metadata and check connectivity.

use super::shared_types::EngineMetadata;
use async_trait::async_trait;

#[async_trait]
pub trait EngineInfo: Send + Sync {
    /// Get Engine version and platform.
    async fn info(&self) -> Result<EngineMetadata, EngineInfoError>;

    /// Ping the Engine to check connectivity.
    async fn ping(&self) -> Result<(), EngineInfoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineInfoError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
