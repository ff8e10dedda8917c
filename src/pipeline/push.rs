// ABOUTME: Push orchestration: pushes each tag in turn and stops at the first registry error.
// ABOUTME: Byte progress from every tag feeds the shared metrics recorder.

use super::error::PipelineError;
use crate::engine::{ConnectError, Engine, EngineSession};
use crate::metrics::MetricsRecorder;
use crate::sink::{CallbackSink, SinkMode, pump};
use crate::types::{ImageReference, TagSet};
use serde::Serialize;
use std::sync::Arc;

/// What a completed push pipeline did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    /// Tags pushed, in push order.
    pub pushed: Vec<String>,
    /// Bytes counted from completed layers across all tags.
    pub bytes: u64,
}

/// Push every tag of `tags` through `session`, sequentially.
///
/// Credentials are resolved per tag against that tag's registry. The first
/// failure is returned naming its tag; later tags are not attempted.
pub async fn push_tags<E: Engine>(
    session: &EngineSession<E>,
    tags: &TagSet,
    metrics: Option<Arc<dyn MetricsRecorder>>,
) -> Result<PushReport, PipelineError> {
    let mut report = PushReport::default();

    for tag in tags.iter() {
        let bytes = push_one(session, tag, metrics.clone()).await?;
        report.pushed.push(tag.to_string());
        report.bytes += bytes;
    }

    tracing::info!(
        tags = report.pushed.len(),
        bytes = report.bytes,
        "push complete"
    );
    Ok(report)
}

async fn push_one<E: Engine>(
    session: &EngineSession<E>,
    tag: &ImageReference,
    metrics: Option<Arc<dyn MetricsRecorder>>,
) -> Result<u64, PipelineError> {
    let failed = |message: String| PipelineError::Push {
        tag: tag.to_string(),
        message,
    };

    tracing::info!(tag = %tag, "pushing");
    let auth = session
        .auth_for(tag)
        .await
        .map_err(|source| PipelineError::Credentials {
            tag: tag.to_string(),
            source,
        })?;

    let mut sink = CallbackSink::new(SinkMode::Push);
    if let Some(metrics) = metrics {
        sink = sink.with_metrics(metrics);
    }
    let sink = Arc::new(sink);

    let stream = session.engine().push_image(tag, auth.as_ref());
    pump(Arc::clone(&sink), stream)
        .await
        .map_err(|e| failed(format!("event stream task failed: {e}")))?;
    sink.await_completion().await;

    sink.outcome().map_err(|e| failed(e.to_string()))?;
    Ok(sink.bytes_pushed())
}

/// Normalize `tags` and push them, opening the session with `open`.
///
/// Tags are validated before `open` is called, so an empty or malformed
/// list never reaches the Engine. The Engine is pinged before the first push.
pub async fn run_push<E, F>(
    tags: &[String],
    metrics: Option<Arc<dyn MetricsRecorder>>,
    open: F,
) -> Result<PushReport, PipelineError>
where
    E: Engine,
    F: FnOnce(&ImageReference) -> Result<EngineSession<E>, ConnectError>,
{
    let tags = TagSet::new(tags)?;
    let session = open(tags.first())?;
    session.ping().await?;
    push_tags(&session, &tags, metrics).await
}
