// ABOUTME: Composable capability traits for the Docker Engine.
// ABOUTME: Defines ImageOps, ContainerOps, PruneOps, EngineInfo and the Engine umbrella.

mod container;
mod image;
mod info;
mod prune;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use info::{EngineInfo, EngineInfoError};
pub use prune::{PruneError, PruneOps};
pub use shared_types::*;

/// Everything the task layer needs from an Engine connection.
pub trait Engine: ImageOps + ContainerOps + PruneOps + EngineInfo {}

impl<T> Engine for T where T: ImageOps + ContainerOps + PruneOps + EngineInfo {}
