// ABOUTME: Integration tests for the streaming callback sink driven through pump().
// ABOUTME: Covers first-error-wins, completion signalling, and per-layer byte de-duplication.

mod support;

use dockhand::engine::{EngineEvent, StreamError};
use dockhand::metrics::{BYTES_PUSHED, MetricRegistry};
use dockhand::sink::{CallbackSink, SinkError, SinkMode, pump};
use futures::StreamExt;
use std::sync::Arc;
use support::{aux_id, error_event, event_stream, layer_done, layer_partial, status, stream_line};

#[tokio::test]
async fn first_error_wins() {
    let sink = Arc::new(CallbackSink::new(SinkMode::Push));
    let stream = event_stream(vec![
        status("Preparing"),
        error_event("unauthorized: first"),
        error_event("unauthorized: second"),
    ]);

    pump(Arc::clone(&sink), stream).await.unwrap();
    sink.await_completion().await;

    assert_eq!(
        sink.outcome(),
        Err(SinkError::Engine("unauthorized: first".to_string()))
    );
}

#[tokio::test]
async fn transport_error_is_captured() {
    let sink = Arc::new(CallbackSink::new(SinkMode::Build));
    let items: Vec<Result<EngineEvent, StreamError>> = vec![
        Ok(stream_line("Step 1/1 : FROM alpine\n")),
        Err(StreamError("connection reset".to_string())),
    ];
    let stream = futures::stream::iter(items).boxed();

    pump(Arc::clone(&sink), stream).await.unwrap();
    sink.await_completion().await;

    let err = sink.outcome().unwrap_err();
    assert!(err.to_string().contains("connection reset"), "got: {err}");
}

#[tokio::test]
async fn completion_is_signalled_for_a_clean_stream() {
    let sink = Arc::new(CallbackSink::new(SinkMode::Build));
    assert!(!sink.is_complete());
    assert_eq!(sink.outcome(), Err(SinkError::Incomplete));

    let handle = pump(
        Arc::clone(&sink),
        event_stream(vec![stream_line("Step 1/1\n"), aux_id("sha256:beef")]),
    );
    sink.await_completion().await;
    handle.await.unwrap();

    assert!(sink.is_complete());
    assert_eq!(sink.outcome(), Ok(()));
    assert_eq!(sink.image_id(), Some("sha256:beef"));
}

#[tokio::test]
async fn repeated_layer_completions_count_once() {
    let metrics = Arc::new(MetricRegistry::new());
    let sink = Arc::new(CallbackSink::new(SinkMode::Push).with_metrics(metrics.clone()));
    let stream = event_stream(vec![
        layer_partial("a", 1, 10),
        layer_done("a", 10),
        layer_done("a", 10),
        layer_done("b", 7),
        layer_partial("c", 3, 9),
    ]);

    pump(Arc::clone(&sink), stream).await.unwrap();
    sink.await_completion().await;

    assert_eq!(sink.bytes_pushed(), 17);
    assert_eq!(metrics.counter(BYTES_PUSHED), 17);
}

#[tokio::test]
async fn pull_mode_counts_nothing() {
    let sink = Arc::new(CallbackSink::new(SinkMode::Pull));

    pump(Arc::clone(&sink), event_stream(vec![layer_done("a", 10)]))
        .await
        .unwrap();
    sink.await_completion().await;

    assert_eq!(sink.bytes_pushed(), 0);
    assert_eq!(sink.outcome(), Ok(()));
}
