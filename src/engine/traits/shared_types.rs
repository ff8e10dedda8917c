// ABOUTME: Shared types used across Engine capability traits.
// ABOUTME: BuildSpec, RegistryAuth, EventStream, prune options and Engine metadata.

use crate::engine::events::{EngineEvent, StreamError};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;

/// Stream of classified Engine events for one long-running operation.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EngineEvent, StreamError>> + Send>>;

/// Everything the Engine needs to run one build.
#[derive(Clone, Default)]
pub struct BuildSpec {
    /// Uncompressed tar of the build context.
    pub context: Vec<u8>,
    /// Path of the Dockerfile inside `context`.
    pub dockerfile: String,
    /// Name given to the built image.
    pub tag: String,
    /// Always attempt to pull a newer base image.
    pub pull: bool,
    /// Comma-joined target platforms; `None` uses the Engine default.
    pub platform: Option<String>,
    pub build_args: HashMap<String, String>,
    pub labels: HashMap<String, String>,
}

impl fmt::Debug for BuildSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildSpec")
            .field("context_bytes", &self.context.len())
            .field("dockerfile", &self.dockerfile)
            .field("tag", &self.tag)
            .field("pull", &self.pull)
            .field("platform", &self.platform)
            .field("build_args", &self.build_args.keys().collect::<Vec<_>>())
            .field("labels", &self.labels)
            .finish()
    }
}

/// Registry authentication forwarded to the Engine with a push or pull.
///
/// Every populated field is sent; the Engine prefers token styles over
/// basic auth when more than one is present.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RegistryAuth {
    pub server_address: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Pre-encoded base64 `username:password`.
    pub auth: Option<String>,
    pub registry_token: Option<String>,
    pub identity_token: Option<String>,
}

impl fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("RegistryAuth")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("auth", &redact(&self.auth))
            .field("registry_token", &redact(&self.registry_token))
            .field("identity_token", &redact(&self.identity_token))
            .finish()
    }
}

/// Kind of object a prune removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruneKind {
    #[serde(alias = "BUILD")]
    Build,
    #[serde(alias = "CONTAINERS")]
    Containers,
    #[serde(alias = "IMAGES")]
    Images,
    #[serde(alias = "NETWORKS")]
    Networks,
    #[serde(alias = "VOLUMES")]
    Volumes,
}

impl fmt::Display for PruneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PruneKind::Build => "build",
            PruneKind::Containers => "containers",
            PruneKind::Images => "images",
            PruneKind::Networks => "networks",
            PruneKind::Volumes => "volumes",
        };
        f.write_str(name)
    }
}

/// Filters applied to a prune.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneFilters {
    /// Images only: `true` prunes untagged images, `false` all unused ones.
    pub dangling: bool,
    /// Containers and images only: created before this timestamp or duration.
    pub until: Option<String>,
    /// `label=value` or `label!=value` expressions.
    pub labels: Vec<String>,
}

impl PruneFilters {
    /// Render as the Engine's `filters` query map for `kind`.
    pub fn to_query(&self, kind: PruneKind) -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        if kind == PruneKind::Images {
            filters.insert("dangling".to_string(), vec![self.dangling.to_string()]);
        }
        if let Some(until) = &self.until
            && matches!(kind, PruneKind::Containers | PruneKind::Images)
        {
            filters.insert("until".to_string(), vec![until.clone()]);
        }
        if !self.labels.is_empty() {
            filters.insert("label".to_string(), self.labels.clone());
        }
        filters
    }
}

/// What a prune removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    pub space_reclaimed: u64,
}

/// Engine metadata.
#[derive(Debug, Clone, Serialize)]
pub struct EngineMetadata {
    pub version: String,
    pub api_version: String,
    pub os: String,
    pub arch: String,
}
