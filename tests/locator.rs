// ABOUTME: Integration tests for resolving Dockerfile and compose inputs to local paths.
// ABOUTME: Covers existing paths, inline content, storage blobs, and multi-file precedence.

mod support;

use dockhand::locator::{COMPOSE_SUFFIX, DOCKERFILE_SUFFIX, FileLocator, FsBlobStore, LocateError};
use std::fs;
use support::MemoryBlobStore;

#[tokio::test]
async fn existing_relative_path_is_used_in_place() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("docker")).unwrap();
    fs::write(dir.path().join("docker/Dockerfile"), "FROM alpine\n").unwrap();
    let store = MemoryBlobStore::default();
    let locator = FileLocator::new(dir.path(), &store);

    let resolved = locator
        .resolve("docker/Dockerfile", DOCKERFILE_SUFFIX)
        .await
        .unwrap();

    assert!(!resolved.is_temporary());
    assert_eq!(resolved.path(), dir.path().join("docker/Dockerfile"));
}

#[tokio::test]
async fn inline_content_is_written_to_a_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlobStore::default();
    let locator = FileLocator::new(dir.path(), &store);

    let resolved = locator
        .resolve("FROM alpine\nRUN echo hi\n", DOCKERFILE_SUFFIX)
        .await
        .unwrap();

    assert!(resolved.is_temporary());
    let path = resolved.path().to_path_buf();
    assert!(path.starts_with(dir.path()));
    assert!(path.to_string_lossy().ends_with(DOCKERFILE_SUFFIX));
    assert_eq!(fs::read_to_string(&path).unwrap(), "FROM alpine\nRUN echo hi\n");

    drop(resolved);
    assert!(!path.exists(), "temporary file is removed on drop");
}

#[tokio::test]
async fn storage_blob_is_fetched() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlobStore::default().with("storage://compose/base.yaml", "services: {}\n");
    let locator = FileLocator::new(dir.path(), &store);

    let resolved = locator
        .resolve("storage://compose/base.yaml", COMPOSE_SUFFIX)
        .await
        .unwrap();

    assert_eq!(fs::read_to_string(resolved.path()).unwrap(), "services: {}\n");
}

#[tokio::test]
async fn fs_store_reads_under_its_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("blobs");
    fs::create_dir_all(root.join("ci")).unwrap();
    fs::write(root.join("ci/Dockerfile"), "FROM scratch\n").unwrap();
    let store = FsBlobStore::new(&root);
    let locator = FileLocator::new(dir.path(), &store);

    let resolved = locator
        .resolve("storage://ci/Dockerfile", DOCKERFILE_SUFFIX)
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(resolved.path()).unwrap(), "FROM scratch\n");

    let err = locator
        .resolve("storage://../escape", DOCKERFILE_SUFFIX)
        .await
        .unwrap_err();
    assert!(matches!(err, LocateError::OutsideRoot(_)));
}

#[tokio::test]
async fn list_wins_over_single_value_and_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), "a").unwrap();
    fs::write(dir.path().join("b.yaml"), "b").unwrap();
    fs::write(dir.path().join("single.yaml"), "s").unwrap();
    let store = MemoryBlobStore::default();
    let locator = FileLocator::new(dir.path(), &store);

    let many = vec!["b.yaml".to_string(), "a.yaml".to_string()];
    let resolved = locator
        .resolve_all(Some("single.yaml"), &many, COMPOSE_SUFFIX)
        .await
        .unwrap();
    let paths: Vec<_> = resolved.iter().map(|r| r.path().to_path_buf()).collect();
    assert_eq!(paths, vec![dir.path().join("b.yaml"), dir.path().join("a.yaml")]);

    let resolved = locator
        .resolve_all(Some("single.yaml"), &[], COMPOSE_SUFFIX)
        .await
        .unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].path(), dir.path().join("single.yaml"));
}

#[tokio::test]
async fn nothing_to_resolve_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryBlobStore::default();
    let locator = FileLocator::new(dir.path(), &store);

    assert!(matches!(
        locator.resolve_all(None, &[], COMPOSE_SUFFIX).await,
        Err(LocateError::Missing)
    ));
    assert!(matches!(
        locator.resolve("  ", DOCKERFILE_SUFFIX).await,
        Err(LocateError::Missing)
    ));
}
