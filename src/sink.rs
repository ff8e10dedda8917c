// ABOUTME: Streaming callback sink turning Engine event streams into logs, an outcome and metrics.
// ABOUTME: Streams are pumped on their own task; the first error is kept in a single-assignment slot.

use crate::engine::{EngineEvent, EventStream, StreamError};
use crate::metrics::{BYTES_PUSHED, MetricsRecorder};
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Receives the classified events of one Engine stream.
pub trait EventSink: Send + Sync {
    /// A build output line.
    fn on_log_line(&self, line: &str);

    /// Any event that carries no error.
    fn on_progress(&self, event: &EngineEvent);

    /// A registry/build error or a transport failure.
    fn on_error(&self, message: String);

    /// The stream ended. Always called exactly once, after every other callback.
    fn on_complete(&self);
}

/// Error captured from a finished stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    #[error("{0}")]
    Engine(String),

    #[error("event stream ended without completing")]
    Incomplete,
}

/// Which operation a sink is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Build,
    Push,
    /// Logged like a push, without byte counting.
    Pull,
}

/// Route one stream item to the sink callbacks.
pub fn dispatch<S: EventSink + ?Sized>(sink: &S, item: Result<EngineEvent, StreamError>) {
    match item {
        Err(e) => sink.on_error(e.to_string()),
        Ok(event) => {
            if let Some(message) = event.error_message() {
                sink.on_error(message);
                return;
            }
            if let Some(line) = event.stream.as_deref() {
                let line = line.trim();
                if !line.is_empty() {
                    sink.on_log_line(line);
                }
            }
            sink.on_progress(&event);
        }
    }
}

/// Consume `stream` on a new task, feeding every item to `sink`.
pub fn pump<S: EventSink + 'static>(sink: Arc<S>, mut stream: EventStream) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            dispatch(sink.as_ref(), item);
        }
        sink.on_complete();
    })
}

/// The sink used by the build and push pipelines.
///
/// Build mode logs output lines and remembers the built image ID. Push mode
/// logs progress and counts pushed bytes, once per layer.
///
/// ```no_run
/// # async fn demo(stream: dockhand::engine::EventStream) {
/// use dockhand::sink::{CallbackSink, SinkMode, pump};
/// use std::sync::Arc;
///
/// let sink = Arc::new(CallbackSink::new(SinkMode::Push));
/// pump(Arc::clone(&sink), stream);
/// sink.await_completion().await;
/// if let Err(e) = sink.outcome() {
///     eprintln!("push failed: {e}");
/// }
/// # }
/// ```
pub struct CallbackSink {
    mode: SinkMode,
    first_error: OnceLock<String>,
    image_id: OnceLock<String>,
    completed_layers: Mutex<HashSet<String>>,
    bytes: AtomicU64,
    metrics: Option<Arc<dyn MetricsRecorder>>,
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl CallbackSink {
    pub fn new(mode: SinkMode) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            mode,
            first_error: OnceLock::new(),
            image_id: OnceLock::new(),
            completed_layers: Mutex::new(HashSet::new()),
            bytes: AtomicU64::new(0),
            metrics: None,
            done_tx,
            done_rx,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn mode(&self) -> SinkMode {
        self.mode
    }

    /// Wait until `on_complete` has been called.
    ///
    /// Returns once the stream has ended, error or not; inspect `outcome()` afterwards.
    pub async fn await_completion(&self) {
        let mut rx = self.done_rx.clone();
        // The sender lives in `self`, so it cannot close while we wait.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn is_complete(&self) -> bool {
        *self.done_rx.borrow()
    }

    /// First captured error, if any.
    pub fn error(&self) -> Option<&str> {
        self.first_error.get().map(String::as_str)
    }

    /// Outcome of the finished stream.
    pub fn outcome(&self) -> Result<(), SinkError> {
        if let Some(message) = self.first_error.get() {
            return Err(SinkError::Engine(message.clone()));
        }
        if !self.is_complete() {
            return Err(SinkError::Incomplete);
        }
        Ok(())
    }

    /// Image ID announced by the build, if any.
    pub fn image_id(&self) -> Option<&str> {
        self.image_id.get().map(String::as_str)
    }

    /// Bytes counted from completed layers.
    pub fn bytes_pushed(&self) -> u64 {
        self.bytes.load(Ordering::SeqCst)
    }

    fn count_completed_layer(&self, event: &EngineEvent) {
        let Some(total) = event.progress_detail.and_then(|d| d.completed_total()) else {
            return;
        };

        // Push messages decoded by the client library lose the layer id.
        let key = match &event.id {
            Some(id) => format!("id:{id}"),
            None => format!("size:{total}"),
        };
        if !self.completed_layers.lock().insert(key) {
            return;
        }

        self.bytes.fetch_add(total, Ordering::SeqCst);
        if let Some(metrics) = &self.metrics {
            metrics.increment(BYTES_PUSHED, total);
        }
    }
}

impl EventSink for CallbackSink {
    fn on_log_line(&self, line: &str) {
        if self.mode == SinkMode::Build {
            tracing::info!("{}", line);
        }
    }

    fn on_progress(&self, event: &EngineEvent) {
        match self.mode {
            SinkMode::Build => {
                if let Some(id) = event.built_image_id() {
                    let _ = self.image_id.set(id);
                }
            }
            SinkMode::Push | SinkMode::Pull => {
                if let Some(progress) = event.progress_detail.and_then(|d| d.current) {
                    tracing::debug!(
                        layer = event.id.as_deref().unwrap_or(""),
                        current = progress,
                        total = event.progress_detail.and_then(|d| d.total),
                        "layer progress"
                    );
                } else if let Some(status) = event.status.as_deref().map(str::trim)
                    && !status.is_empty()
                {
                    match event.id.as_deref() {
                        Some(id) => tracing::info!("{}: {}", id, status),
                        None => tracing::info!("{}", status),
                    }
                }
                if self.mode == SinkMode::Push {
                    self.count_completed_layer(event);
                }
            }
        }
    }

    fn on_error(&self, message: String) {
        if self.first_error.set(message).is_err() {
            tracing::debug!("ignoring error after the first");
        }
    }

    fn on_complete(&self) {
        self.done_tx.send_replace(true);
    }
}
