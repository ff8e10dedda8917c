// ABOUTME: Integration tests against a live local Docker Engine.
// ABOUTME: Run with the `docker` test group; they need DOCKER_HOST or the default socket.

mod support;

use dockhand::engine::{Connector, DockerConnector, EngineInfo, EngineSettings};
use dockhand::locator::FsBlobStore;
use dockhand::pipeline::{BuildRequest, Workspace, run_build};

fn connector() -> DockerConnector {
    DockerConnector::new(EngineSettings::default())
}

/// Test: Engine answers a ping and reports its version.
#[test_group::group(docker)]
#[tokio::test]
async fn engine_info() {
    support::init_tracing();
    let session = connector().open(None).expect("session should open");

    session.ping().await.expect("engine should answer");
    let info = session.engine().info().await.expect("should get engine info");
    assert!(!info.version.is_empty(), "version should not be empty");
}

/// Test: Building the same inline Dockerfile twice yields the same image ID.
#[test_group::group(docker)]
#[tokio::test]
async fn inline_build_returns_stable_id() {
    support::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path().join("storage"));
    let workspace = Workspace {
        working_dir: dir.path(),
        store: &store,
        metrics: None,
    };
    let connector = connector();
    let request = BuildRequest {
        dockerfile: "FROM busybox:1.36\nLABEL purpose=dockhand-test\n".to_string(),
        tags: vec!["dockhand-test:stable".to_string()],
        pull: false,
        ..Default::default()
    };

    let first = run_build(&request, &workspace, |target| connector.open(Some(target)))
        .await
        .expect("first build should succeed");
    let second = run_build(&request, &workspace, |target| connector.open(Some(target)))
        .await
        .expect("second build should succeed");

    assert!(!first.image_id.as_str().is_empty());
    assert_eq!(first.image_id, second.image_id);
}
