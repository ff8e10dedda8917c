// ABOUTME: One-shot image tasks: pull, tag, and the image command (tag or remove).
// ABOUTME: Tag targets split with the repository[:tag] rule; pulls are streamed through a sink.

use super::TaskOutput;
use crate::engine::{Connector, Engine, EngineSession, ImageOps};
use crate::error::{Error, Result};
use crate::sink::{CallbackSink, SinkMode, pump};
use crate::types::ImageReference;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct PullTask {
    pub image: String,
}

/// Prefix `image` with the credential registry unless it already starts with it.
pub fn pull_reference(image: &str, registry: Option<&str>) -> String {
    match registry.map(str::trim).filter(|r| !r.is_empty()) {
        Some(registry) if !image.starts_with(registry) => format!("{registry}/{image}"),
        _ => image.to_string(),
    }
}

impl PullTask {
    pub async fn run<C: Connector>(&self, connector: &C) -> Result<TaskOutput> {
        let registry = connector.credential().and_then(|c| c.registry.as_deref());
        let image = pull_reference(self.image.trim(), registry);
        // A digest is pulled as given; only the name scopes credentials.
        let (name, digest) = match image.split_once('@') {
            Some((name, digest)) => (name, Some(digest)),
            None => (image.as_str(), None),
        };
        let reference = ImageReference::parse(name)?;
        let target = match digest {
            Some(digest) => format!("{}@{digest}", reference.repository()),
            None => reference.to_string(),
        };

        let session = connector.open(Some(&reference))?;
        let auth = session.auth_for(&reference).await?;

        tracing::info!(image = %target, "pulling");
        let sink = Arc::new(CallbackSink::new(SinkMode::Pull));
        let stream = session.engine().pull_image(&target, auth.as_ref());

        let failed = |message: String| Error::Pull {
            image: target.clone(),
            message,
        };
        pump(Arc::clone(&sink), stream)
            .await
            .map_err(|e| failed(e.to_string()))?;
        sink.await_completion().await;
        sink.outcome().map_err(|e| failed(e.to_string()))?;

        tracing::info!(image = %target, "pulled");
        Ok(TaskOutput::Pull { image: target })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagTask {
    pub source_image: String,
    pub target_image: String,
}

async fn apply_tag<E: Engine>(
    session: &EngineSession<E>,
    source: &str,
    target: &str,
) -> Result<ImageReference> {
    let target = ImageReference::parse(target)?;
    tracing::info!(source, target = %target, "tagging image");
    session.engine().tag_image(source, &target).await?;
    Ok(target)
}

impl TagTask {
    pub async fn run<C: Connector>(&self, connector: &C) -> Result<TaskOutput> {
        let source = self.source_image.trim();
        let session = connector.open(ImageReference::parse(source).ok().as_ref())?;
        let target = apply_tag(&session, source, &self.target_image).await?;

        Ok(TaskOutput::Tag {
            source: source.to_string(),
            target: target.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCommand {
    Tag,
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageTask {
    pub command: ImageCommand,
    pub source_image: String,
    #[serde(default)]
    pub target_image: Option<String>,
    #[serde(default)]
    pub force: bool,
}

impl ImageTask {
    pub async fn run<C: Connector>(&self, connector: &C) -> Result<TaskOutput> {
        let source = self.source_image.trim();

        // Checked before connecting: a missing target is a configuration error.
        let target = match self.command {
            ImageCommand::Tag => Some(
                self.target_image
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        Error::InvalidConfig(
                            "target_image must be provided for the tag command".to_string(),
                        )
                    })?,
            ),
            ImageCommand::Remove => None,
        };

        let session = connector.open(ImageReference::parse(source).ok().as_ref())?;
        match target {
            Some(target) => {
                apply_tag(&session, source, target).await?;
            }
            None => {
                tracing::info!(image = source, force = self.force, "removing image");
                session.engine().remove_image(source, self.force).await?;
            }
        }

        Ok(TaskOutput::Image {
            command: self.command,
            source: source.to_string(),
        })
    }
}
