// ABOUTME: Docker Engine access: capability traits, bollard implementation and sessions.
// ABOUTME: Also owns registry credential resolution and the streamed event model.

pub mod auth;
mod bollard;
mod client;
mod error;
pub mod events;
pub mod traits;

pub use self::bollard::BollardEngine;
pub use auth::{AuthError, CredentialResolver, DockerConfig, DockerConfigSource, RegistryCredential};
pub use client::{Connector, DockerConnector, EngineSession, EngineSettings};
pub use error::{ConnectError, ConnectErrorKind};
pub use events::{EngineEvent, ErrorDetail, ProgressDetail, StreamError};
pub use traits::*;
