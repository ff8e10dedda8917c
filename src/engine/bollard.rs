// ABOUTME: Bollard-based Docker Engine implementation.
// ABOUTME: Maps Engine API responses and streams onto the capability traits.

use crate::engine::error::{ConnectError, ConnectSnafu};
use crate::engine::events::{EngineEvent, ErrorDetail, ProgressDetail, StreamError};
use crate::engine::traits::{
    BuildSpec, ContainerError, ContainerOps, EngineInfo, EngineInfoError, EngineMetadata,
    EventStream, ImageError, ImageOps, PruneError, PruneFilters, PruneKind, PruneOps,
    PruneReport, RegistryAuth,
};
use crate::types::{ContainerId, ImageReference, split_repo_tag};
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::models::{BuildInfo, CreateImageInfo, PushImageInfo};
use bollard::query_parameters::{
    BuildImageOptions, CreateImageOptions, KillContainerOptions, PruneBuildOptions,
    PruneContainersOptions, PruneImagesOptions, PruneNetworksOptions, PruneVolumesOptions,
    PushImageOptions, RemoveContainerOptions, RemoveImageOptions, StopContainerOptions,
    TagImageOptions,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body_util::{Either, Full};
use serde_json::json;
use snafu::ResultExt;

/// Seconds bollard waits on a single request.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// =============================================================================
// Error Mapping Helpers
// =============================================================================

fn map_image_error(e: bollard::errors::Error, image_name: &str) -> ImageError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 404 =>
        {
            ImageError::NotFound(image_name.to_string())
        }
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ImageError::InUse(format!("{}: {}", image_name, message)),
        _ => ImageError::Runtime(format!("{}: {}", image_name, e)),
    }
}

fn map_container_error(e: bollard::errors::Error) -> ContainerError {
    match &e {
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 404 => ContainerError::NotFound(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 304 => ContainerError::NotRunning(message.clone()),
        bollard::errors::Error::DockerResponseServerError {
            status_code,
            message,
        } if *status_code == 409 => ContainerError::Conflict(message.clone()),
        _ => ContainerError::Runtime(e.to_string()),
    }
}

fn map_prune_error(e: bollard::errors::Error) -> PruneError {
    match &e {
        bollard::errors::Error::DockerResponseServerError { status_code, .. }
            if *status_code == 409 =>
        {
            PruneError::AlreadyRunning
        }
        _ => PruneError::Runtime(e.to_string()),
    }
}

fn to_credentials(auth: &RegistryAuth) -> DockerCredentials {
    DockerCredentials {
        username: auth.username.clone(),
        password: auth.password.clone(),
        auth: auth.auth.clone(),
        serveraddress: auth.server_address.clone(),
        identitytoken: auth.identity_token.clone(),
        registrytoken: auth.registry_token.clone(),
        ..Default::default()
    }
}

/// Classify each message of a bollard stream into an `EngineEvent`.
///
/// bollard turns messages carrying `errorDetail` into `DockerStreamError`;
/// those become error events again so the sink treats them as Engine errors.
fn classify<S, T>(stream: S) -> EventStream
where
    S: Stream<Item = Result<T, bollard::errors::Error>> + Send + 'static,
    T: Into<EngineEvent>,
{
    Box::pin(stream.map(|item| match item {
        Ok(model) => Ok(model.into()),
        Err(bollard::errors::Error::DockerStreamError { error }) => Ok(EngineEvent::failure(error)),
        Err(e) => Err(StreamError(e.to_string())),
    }))
}

fn progress_detail(detail: Option<bollard::models::ProgressDetail>) -> Option<ProgressDetail> {
    detail.map(|d| ProgressDetail {
        current: d.current,
        total: d.total,
    })
}

fn error_detail(detail: Option<bollard::models::ErrorDetail>) -> Option<ErrorDetail> {
    detail.map(|d| ErrorDetail {
        code: d.code,
        message: d.message,
    })
}

impl From<BuildInfo> for EngineEvent {
    fn from(info: BuildInfo) -> Self {
        EngineEvent {
            id: info.id,
            status: info.status,
            progress_detail: progress_detail(info.progress_detail),
            error_detail: error_detail(info.error_detail),
            stream: info.stream,
            aux: info.aux.and_then(|aux| aux.id).map(|id| json!({ "ID": id })),
            ..Default::default()
        }
    }
}

// bollard's push model has no `id`; the sink falls back to the layer size.
impl From<PushImageInfo> for EngineEvent {
    fn from(info: PushImageInfo) -> Self {
        EngineEvent {
            status: info.status,
            progress_detail: progress_detail(info.progress_detail),
            error_detail: error_detail(info.error_detail),
            ..Default::default()
        }
    }
}

impl From<CreateImageInfo> for EngineEvent {
    fn from(info: CreateImageInfo) -> Self {
        EngineEvent {
            id: info.id,
            status: info.status,
            progress_detail: progress_detail(info.progress_detail),
            error_detail: error_detail(info.error_detail),
            ..Default::default()
        }
    }
}

fn bytes_reclaimed(space: Option<i64>) -> u64 {
    space.and_then(|s| u64::try_from(s).ok()).unwrap_or(0)
}

// =============================================================================
// BollardEngine
// =============================================================================

/// Docker Engine reached through bollard.
pub struct BollardEngine {
    client: Docker,
}

impl BollardEngine {
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect to the Engine at `host`, or the environment's default when `None`.
    ///
    /// Accepts `unix://` socket paths and `tcp://`/`http://` addresses.
    /// Connecting is lazy; the first request surfaces an unreachable Engine.
    pub fn connect(host: Option<&str>) -> Result<Self, ConnectError> {
        let client = match host {
            None => Docker::connect_with_defaults(),
            Some(host) => match host.strip_prefix("unix://") {
                Some(path) => {
                    Docker::connect_with_unix(path, REQUEST_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                }
                None => Docker::connect_with_http(
                    host,
                    REQUEST_TIMEOUT_SECS,
                    bollard::API_DEFAULT_VERSION,
                ),
            },
        }
        .context(ConnectSnafu {
            host: host.unwrap_or("default").to_string(),
        })?;

        Ok(Self::new(client))
    }
}

#[async_trait]
impl EngineInfo for BollardEngine {
    async fn info(&self) -> Result<EngineMetadata, EngineInfoError> {
        let info = self
            .client
            .info()
            .await
            .map_err(|e| EngineInfoError::ConnectionFailed(e.to_string()))?;

        Ok(EngineMetadata {
            version: info.server_version.unwrap_or_default(),
            api_version: bollard::API_DEFAULT_VERSION.to_string(),
            os: info.operating_system.unwrap_or_default(),
            arch: info.architecture.unwrap_or_default(),
        })
    }

    async fn ping(&self) -> Result<(), EngineInfoError> {
        self.client
            .ping()
            .await
            .map_err(|e| EngineInfoError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ImageOps for BollardEngine {
    /// Must be called within a Tokio runtime: bollard's build stream borrows
    /// the client, so it is driven on its own task and forwarded.
    fn build_image(&self, spec: BuildSpec) -> EventStream {
        let options = BuildImageOptions {
            dockerfile: spec.dockerfile,
            t: Some(spec.tag),
            pull: spec.pull.then(|| "1".to_string()),
            rm: true,
            buildargs: (!spec.build_args.is_empty()).then_some(spec.build_args),
            labels: (!spec.labels.is_empty()).then_some(spec.labels),
            platform: spec.platform.unwrap_or_default(),
            ..Default::default()
        };

        let body = Either::Left(Full::new(Bytes::from(spec.context)));
        let client = self.client.clone();
        let (tx, rx) = futures::channel::mpsc::unbounded();

        tokio::spawn(async move {
            let mut stream = client.build_image(options, None, Some(body));
            while let Some(item) = stream.next().await {
                if tx.unbounded_send(item).is_err() {
                    tracing::debug!("build stream receiver dropped");
                    break;
                }
            }
        });

        classify(rx)
    }

    fn push_image(&self, reference: &ImageReference, auth: Option<&RegistryAuth>) -> EventStream {
        let options = PushImageOptions {
            tag: Some(reference.tag().to_string()),
            ..Default::default()
        };

        classify(self.client.push_image(
            reference.repository(),
            Some(options),
            auth.map(to_credentials),
        ))
    }

    fn pull_image(&self, image: &str, auth: Option<&RegistryAuth>) -> EventStream {
        let options = if image.contains('@') {
            CreateImageOptions {
                from_image: Some(image.to_string()),
                ..Default::default()
            }
        } else {
            let (repository, tag) = split_repo_tag(image);
            CreateImageOptions {
                from_image: Some(repository.to_string()),
                tag: Some(tag.to_string()),
                ..Default::default()
            }
        };

        classify(
            self.client
                .create_image(Some(options), None, auth.map(to_credentials)),
        )
    }

    async fn tag_image(&self, source: &str, target: &ImageReference) -> Result<(), ImageError> {
        let options = TagImageOptions {
            repo: Some(target.repository().to_string()),
            tag: Some(target.tag().to_string()),
        };

        self.client
            .tag_image(source, Some(options))
            .await
            .map_err(|e| ImageError::TagFailed {
                source_image: source.to_string(),
                target: target.to_string(),
                message: e.to_string(),
            })
    }

    async fn remove_image(&self, image: &str, force: bool) -> Result<(), ImageError> {
        let options = RemoveImageOptions {
            force,
            ..Default::default()
        };

        self.client
            .remove_image(image, Some(options), None)
            .await
            .map_err(|e| map_image_error(e, image))?;

        Ok(())
    }
}

#[async_trait]
impl ContainerOps for BollardEngine {
    async fn stop_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .stop_container(id.as_str(), None::<StopContainerOptions>)
            .await
            .map_err(map_container_error)
    }

    async fn kill_container(&self, id: &ContainerId) -> Result<(), ContainerError> {
        self.client
            .kill_container(id.as_str(), None::<KillContainerOptions>)
            .await
            .map_err(map_container_error)
    }

    async fn remove_container(
        &self,
        id: &ContainerId,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), ContainerError> {
        let options = RemoveContainerOptions {
            force,
            v: remove_volumes,
            ..Default::default()
        };

        self.client
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(map_container_error)
    }
}

#[async_trait]
impl PruneOps for BollardEngine {
    async fn prune(
        &self,
        kind: PruneKind,
        filters: &PruneFilters,
    ) -> Result<PruneReport, PruneError> {
        let query = Some(filters.to_query(kind));

        let report = match kind {
            PruneKind::Images => {
                let response = self
                    .client
                    .prune_images(Some(PruneImagesOptions { filters: query }))
                    .await
                    .map_err(map_prune_error)?;
                PruneReport {
                    deleted: response
                        .images_deleted
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(|item| item.deleted.or(item.untagged))
                        .collect(),
                    space_reclaimed: bytes_reclaimed(response.space_reclaimed),
                }
            }
            PruneKind::Containers => {
                let response = self
                    .client
                    .prune_containers(Some(PruneContainersOptions { filters: query }))
                    .await
                    .map_err(map_prune_error)?;
                PruneReport {
                    deleted: response.containers_deleted.unwrap_or_default(),
                    space_reclaimed: bytes_reclaimed(response.space_reclaimed),
                }
            }
            PruneKind::Networks => {
                let response = self
                    .client
                    .prune_networks(Some(PruneNetworksOptions { filters: query }))
                    .await
                    .map_err(map_prune_error)?;
                PruneReport {
                    deleted: response.networks_deleted.unwrap_or_default(),
                    space_reclaimed: 0,
                }
            }
            PruneKind::Volumes => {
                let response = self
                    .client
                    .prune_volumes(Some(PruneVolumesOptions { filters: query }))
                    .await
                    .map_err(map_prune_error)?;
                PruneReport {
                    deleted: response.volumes_deleted.unwrap_or_default(),
                    space_reclaimed: bytes_reclaimed(response.space_reclaimed),
                }
            }
            PruneKind::Build => {
                let response = self
                    .client
                    .prune_build(Some(PruneBuildOptions {
                        filters: query,
                        ..Default::default()
                    }))
                    .await
                    .map_err(map_prune_error)?;
                PruneReport {
                    deleted: response.caches_deleted.unwrap_or_default(),
                    space_reclaimed: bytes_reclaimed(response.space_reclaimed),
                }
            }
        };

        tracing::debug!(%kind, deleted = report.deleted.len(), "prune finished");
        Ok(report)
    }
}
