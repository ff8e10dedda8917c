// ABOUTME: Engine client factory producing sessions scoped to a target image's registry.
// ABOUTME: A session bundles the Engine, the credential resolver and the scope, released on drop.

use super::auth::{CredentialResolver, DockerConfigSource, RegistryCredential};
use super::bollard::BollardEngine;
use super::error::{ConnectError, CredentialsSnafu};
use super::traits::{Engine, RegistryAuth};
use crate::types::{DEFAULT_REGISTRY, ImageReference};
use snafu::ResultExt;

/// How to reach the Engine and authenticate against registries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSettings {
    /// `unix://`, `tcp://` or `http://` address; `None` uses local defaults.
    pub host: Option<String>,
    /// Docker-login config used as the full auth source when set.
    pub config: Option<DockerConfigSource>,
    pub credential: Option<RegistryCredential>,
}

impl EngineSettings {
    /// `tcp://` addresses are spoken to over plain HTTP.
    pub fn normalized_host(&self) -> Option<String> {
        self.host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|h| match h.strip_prefix("tcp://") {
                Some(rest) => format!("http://{rest}"),
                None => h.to_string(),
            })
    }
}

/// An open Engine connection scoped to one registry.
///
/// Sessions are opened per pipeline invocation. Dropping the session
/// releases the underlying client on every exit path.
pub struct EngineSession<E: Engine> {
    engine: E,
    resolver: CredentialResolver,
    scope: String,
}

impl EngineSession<BollardEngine> {
    /// Connect to the Engine described by `settings`, scoped to `target`'s registry.
    ///
    /// The docker config is loaded before connecting so a broken file fails
    /// without touching the Engine.
    pub fn open(
        settings: &EngineSettings,
        target: Option<&ImageReference>,
    ) -> Result<Self, ConnectError> {
        let resolver =
            CredentialResolver::load(settings.config.as_ref(), settings.credential.clone())
                .context(CredentialsSnafu)?;
        let host = settings.normalized_host();
        let engine = BollardEngine::connect(host.as_deref())?;

        tracing::debug!(
            host = host.as_deref().unwrap_or("default"),
            "engine session opened"
        );
        Ok(Self::new(engine, resolver, target))
    }
}

impl<E: Engine> EngineSession<E> {
    /// Wrap an Engine. The scope is the credential's explicit registry, else
    /// the target's registry, else Docker Hub.
    pub fn new(engine: E, resolver: CredentialResolver, target: Option<&ImageReference>) -> Self {
        let scope = resolver
            .credential()
            .and_then(|c| c.registry.clone())
            .or_else(|| target.map(|t| t.registry_host().to_string()))
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
        Self {
            engine,
            resolver,
            scope,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn credential(&self) -> Option<&RegistryCredential> {
        self.resolver.credential()
    }

    /// Auth to send when pushing or pulling `reference`.
    pub async fn auth_for(
        &self,
        reference: &ImageReference,
    ) -> Result<Option<RegistryAuth>, ConnectError> {
        self.resolver
            .resolve(reference)
            .await
            .context(CredentialsSnafu)
    }

    /// Check the Engine answers before starting a long operation.
    pub async fn ping(&self) -> Result<(), ConnectError> {
        self.engine.ping().await?;
        Ok(())
    }
}

/// Opens Engine sessions for tasks.
pub trait Connector: Send + Sync {
    type Engine: Engine;

    /// Open a session scoped to `target`'s registry, or unscoped for tasks
    /// that do not touch a registry.
    fn open(
        &self,
        target: Option<&ImageReference>,
    ) -> Result<EngineSession<Self::Engine>, ConnectError>;

    /// Explicit registry credential the sessions will carry.
    fn credential(&self) -> Option<&RegistryCredential>;

    /// Engine address for child processes that talk to the Engine themselves.
    fn docker_host(&self) -> Option<String> {
        None
    }
}

/// Connector reaching a real Engine through bollard.
#[derive(Debug, Clone, Default)]
pub struct DockerConnector {
    settings: EngineSettings,
}

impl DockerConnector {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl Connector for DockerConnector {
    type Engine = BollardEngine;

    fn open(
        &self,
        target: Option<&ImageReference>,
    ) -> Result<EngineSession<BollardEngine>, ConnectError> {
        EngineSession::open(&self.settings, target)
    }

    fn credential(&self) -> Option<&RegistryCredential> {
        self.settings.credential.as_ref()
    }

    fn docker_host(&self) -> Option<String> {
        self.settings
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
    }
}

impl<E: Engine> Drop for EngineSession<E> {
    fn drop(&mut self) {
        tracing::debug!(registry = %self.scope, "engine session released");
    }
}
