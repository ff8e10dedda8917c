// ABOUTME: Test support utilities.
// ABOUTME: Provides a scripted in-memory Engine, a counting connector, and event builders.

#![allow(dead_code)]

use async_trait::async_trait;
use dockhand::engine::{
    BuildSpec, ConnectError, Connector, ContainerError, ContainerOps, CredentialResolver,
    DockerConfig, EngineEvent, EngineInfo, EngineInfoError, EngineMetadata, EngineSession, ErrorDetail,
    EventStream, ImageError, ImageOps, ProgressDetail, PruneError, PruneFilters, PruneKind,
    PruneOps, PruneReport, RegistryAuth, RegistryCredential,
};
use dockhand::locator::{BlobStore, LocateError};
use dockhand::types::{ContainerId, ImageReference};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("dockhand=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn stream_line(line: &str) -> EngineEvent {
    EngineEvent {
        stream: Some(line.to_string()),
        ..Default::default()
    }
}

pub fn aux_id(id: &str) -> EngineEvent {
    EngineEvent {
        aux: Some(serde_json::json!({ "ID": id })),
        ..Default::default()
    }
}

pub fn status(text: &str) -> EngineEvent {
    EngineEvent {
        status: Some(text.to_string()),
        ..Default::default()
    }
}

/// A layer whose `current` has reached `total`.
pub fn layer_done(id: &str, total: i64) -> EngineEvent {
    EngineEvent {
        id: Some(id.to_string()),
        status: Some("Pushing".to_string()),
        progress: Some("[==================================================>]".to_string()),
        progress_detail: Some(ProgressDetail {
            current: Some(total),
            total: Some(total),
        }),
        ..Default::default()
    }
}

pub fn layer_partial(id: &str, current: i64, total: i64) -> EngineEvent {
    EngineEvent {
        id: Some(id.to_string()),
        status: Some("Pushing".to_string()),
        progress_detail: Some(ProgressDetail {
            current: Some(current),
            total: Some(total),
        }),
        ..Default::default()
    }
}

pub fn error_event(message: &str) -> EngineEvent {
    EngineEvent {
        error_detail: Some(ErrorDetail {
            code: None,
            message: Some(message.to_string()),
        }),
        error: Some(message.to_string()),
        ..Default::default()
    }
}

pub fn event_stream(events: Vec<EngineEvent>) -> EventStream {
    futures::stream::iter(events.into_iter().map(Ok)).boxed()
}

/// Everything the fake Engine was asked to do, plus its scripted answers.
#[derive(Default)]
pub struct FakeState {
    pub build_events: Mutex<Vec<EngineEvent>>,
    pub push_events: Mutex<Vec<EngineEvent>>,
    pub failing_pushes: Mutex<HashSet<String>>,
    pub failing_tags: Mutex<HashSet<String>>,
    /// Pings fail, as with a stopped daemon behind a lazy client.
    pub daemon_stopped: AtomicBool,

    pub builds: Mutex<Vec<BuildSpec>>,
    pub tagged: Mutex<Vec<(String, String)>>,
    pub pushed: Mutex<Vec<String>>,
    pub push_auths: Mutex<Vec<Option<RegistryAuth>>>,
    pub pulled: Mutex<Vec<String>>,
    pub removed_images: Mutex<Vec<(String, bool)>>,
    pub stopped: Mutex<Vec<String>>,
    pub killed: Mutex<Vec<String>>,
    pub removed_containers: Mutex<Vec<(String, bool, bool)>>,
    pub prunes: Mutex<Vec<(PruneKind, PruneFilters)>>,
}

/// In-memory Engine answering from scripted events and recording every call.
#[derive(Clone, Default)]
pub struct FakeEngine {
    pub state: Arc<FakeState>,
}

impl FakeEngine {
    /// An Engine whose builds succeed with `image_id` and whose pushes
    /// report two completed layers.
    pub fn new(image_id: &str) -> Self {
        let engine = Self::default();
        *engine.state.build_events.lock() = vec![
            stream_line("Step 1/1 : FROM alpine\n"),
            stream_line("   \n"),
            aux_id(image_id),
        ];
        *engine.state.push_events.lock() = vec![
            status("The push refers to repository"),
            layer_partial("layer-a", 10, 100),
            layer_done("layer-a", 100),
            layer_done("layer-a", 100),
            layer_done("layer-b", 50),
            status("latest: digest: sha256:feed size: 1"),
        ];
        engine
    }

    pub fn fail_push_of(&self, tag: &str) {
        self.state.failing_pushes.lock().insert(tag.to_string());
    }

    pub fn fail_tagging_as(&self, tag: &str) {
        self.state.failing_tags.lock().insert(tag.to_string());
    }

    pub fn stop_daemon(&self) {
        self.state.daemon_stopped.store(true, Ordering::SeqCst);
    }

    pub fn script_build(&self, events: Vec<EngineEvent>) {
        *self.state.build_events.lock() = events;
    }

    pub fn pushed(&self) -> Vec<String> {
        self.state.pushed.lock().clone()
    }

    pub fn builds(&self) -> Vec<BuildSpec> {
        self.state.builds.lock().clone()
    }

    pub fn tagged(&self) -> Vec<(String, String)> {
        self.state.tagged.lock().clone()
    }
}

#[async_trait]
impl ImageOps for FakeEngine {
    fn build_image(&self, spec: BuildSpec) -> EventStream {
        self.state.builds.lock().push(spec);
        event_stream(self.state.build_events.lock().clone())
    }

    fn push_image(&self, reference: &ImageReference, auth: Option<&RegistryAuth>) -> EventStream {
        let tag = reference.to_string();
        self.state.pushed.lock().push(tag.clone());
        self.state.push_auths.lock().push(auth.cloned());

        if self.state.failing_pushes.lock().contains(&tag) {
            return event_stream(vec![
                status("The push refers to repository"),
                error_event(&format!("denied: requested access to {tag} is denied")),
            ]);
        }
        event_stream(self.state.push_events.lock().clone())
    }

    fn pull_image(&self, image: &str, _auth: Option<&RegistryAuth>) -> EventStream {
        self.state.pulled.lock().push(image.to_string());
        event_stream(vec![
            status("Pulling from library/alpine"),
            status("Status: Downloaded newer image"),
        ])
    }

    async fn tag_image(&self, source: &str, target: &ImageReference) -> Result<(), ImageError> {
        let target = target.to_string();
        if self.state.failing_tags.lock().contains(&target) {
            return Err(ImageError::TagFailed {
                source_image: source.to_string(),
                target,
                message: "conflict".to_string(),
            });
        }
        self.state.tagged.lock().push((source.to_string(), target));
        Ok(())
    }

    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError> {
        self.state
            .removed_images
            .lock()
            .push((image.to_string(), force));
        Ok(())
    }
}

#[async_trait]
impl ContainerOps for FakeEngine {
    async fn stop_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.state.stopped.lock().push(id.to_string());
        Ok(())
    }

    async fn kill_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.state.killed.lock().push(id.to_string());
        Ok(())
    }

    async fn remove_container(
        &self,
        id: &ContainerId,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), ContainerError> {
        self.state
            .removed_containers
            .lock()
            .push((id.to_string(), force, remove_volumes));
        Ok(())
    }
}

#[async_trait]
impl PruneOps for FakeEngine {
    async fn prune(
        &self,
        kind: PruneKind,
        filters: &PruneFilters,
    ) -> Result<PruneReport, PruneError> {
        self.state.prunes.lock().push((kind, filters.clone()));
        Ok(PruneReport {
            deleted: vec!["sha256:old".to_string()],
            space_reclaimed: 4096,
        })
    }
}

#[async_trait]
impl EngineInfo for FakeEngine {
    async fn info(&self) -> Result<EngineMetadata, EngineInfoError> {
        Ok(EngineMetadata {
            version: "27.0.0".to_string(),
            api_version: "1.47".to_string(),
            os: "linux".to_string(),
            arch: "amd64".to_string(),
        })
    }

    async fn ping(&self) -> Result<(), EngineInfoError> {
        if self.state.daemon_stopped.load(Ordering::SeqCst) {
            return Err(EngineInfoError::ConnectionFailed(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connector handing out sessions on a shared [`FakeEngine`].
#[derive(Default)]
pub struct FakeConnector {
    pub engine: FakeEngine,
    pub credential: Option<RegistryCredential>,
    pub docker_config: Option<DockerConfig>,
    pub unreachable: bool,
    opens: AtomicUsize,
}

impl FakeConnector {
    pub fn new(engine: FakeEngine) -> Self {
        Self {
            engine,
            ..Default::default()
        }
    }

    pub fn with_credential(mut self, credential: RegistryCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_docker_config(mut self, config: DockerConfig) -> Self {
        self.docker_config = Some(config);
        self
    }

    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    /// How many sessions were opened.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Connector for FakeConnector {
    type Engine = FakeEngine;

    fn open(
        &self,
        target: Option<&ImageReference>,
    ) -> Result<EngineSession<FakeEngine>, ConnectError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(ConnectError::Unreachable {
                source: EngineInfoError::ConnectionFailed("connection refused".to_string()),
            });
        }
        Ok(EngineSession::new(
            self.engine.clone(),
            CredentialResolver::new(self.docker_config.clone(), self.credential.clone()),
            target,
        ))
    }

    fn credential(&self) -> Option<&RegistryCredential> {
        self.credential.as_ref()
    }
}

/// Blob store serving fixed contents.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn with(mut self, uri: &str, content: &str) -> Self {
        self.blobs.insert(uri.to_string(), content.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, uri: &str) -> Result<Vec<u8>, LocateError> {
        self.blobs
            .get(uri)
            .cloned()
            .ok_or_else(|| LocateError::StorageRead {
                uri: uri.to_string(),
                message: "no such blob".to_string(),
            })
    }
}
