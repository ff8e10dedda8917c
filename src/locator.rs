// ABOUTME: Resolves Dockerfile and compose-file inputs into local paths the Engine can read.
// ABOUTME: Handles storage:// blobs, paths relative to the working directory, and inline content.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// URI scheme of blobs held by the storage collaborator.
pub const STORAGE_SCHEME: &str = "storage://";

/// Extension given to materialized Dockerfiles.
pub const DOCKERFILE_SUFFIX: &str = ".dockerfile";

/// Extension given to materialized compose files.
pub const COMPOSE_SUFFIX: &str = ".yaml";

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("no file source given")]
    Missing,

    #[error("failed to read {uri} from storage: {message}")]
    StorageRead { uri: String, message: String },

    #[error("storage path escapes the storage root: {0}")]
    OutsideRoot(String),

    #[error("failed to write temporary file in {dir}: {source}")]
    TempFile {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// Source of `storage://` blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Fetch the bytes behind `uri`.
    async fn get(&self, uri: &str) -> Result<Vec<u8>, LocateError>;
}

/// Blob store backed by a local directory.
///
/// `storage://a/b` maps to `<root>/a/b`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, uri: &str) -> Result<PathBuf, LocateError> {
        let relative = uri.strip_prefix(STORAGE_SCHEME).unwrap_or(uri);
        let relative = Path::new(relative.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(LocateError::OutsideRoot(uri.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, uri: &str) -> Result<Vec<u8>, LocateError> {
        let path = self.path_for(uri)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| LocateError::StorageRead {
                uri: uri.to_string(),
                message: format!("{}: {}", path.display(), e),
            })
    }
}

/// A located file; temporary files are deleted when this is dropped.
#[derive(Debug)]
pub enum ResolvedFile {
    /// File that already existed under the working directory.
    Existing(PathBuf),
    /// Content materialized into a temporary file.
    Temporary(NamedTempFile),
}

impl ResolvedFile {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedFile::Existing(path) => path,
            ResolvedFile::Temporary(file) => file.path(),
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, ResolvedFile::Temporary(_))
    }
}

/// Turns a rendered file input into a local path.
pub struct FileLocator<'a> {
    working_dir: &'a Path,
    store: &'a dyn BlobStore,
}

impl<'a> FileLocator<'a> {
    pub fn new(working_dir: &'a Path, store: &'a dyn BlobStore) -> Self {
        Self { working_dir, store }
    }

    /// Resolve one value.
    ///
    /// A `storage://` reference is fetched into a temporary file. A value
    /// naming an existing file under the working directory is returned as
    /// that path. Anything else is treated as the file's content.
    pub async fn resolve(&self, value: &str, suffix: &str) -> Result<ResolvedFile, LocateError> {
        if value.trim().is_empty() {
            return Err(LocateError::Missing);
        }

        if value.starts_with(STORAGE_SCHEME) {
            let bytes = self.store.get(value).await?;
            tracing::debug!(uri = value, bytes = bytes.len(), "fetched file from storage");
            return self.materialize(&bytes, suffix).map(ResolvedFile::Temporary);
        }

        let candidate = self.working_dir.join(value);
        if is_plausible_path(value) && candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "using file from working directory");
            return Ok(ResolvedFile::Existing(candidate));
        }

        tracing::debug!("treating value as inline file content");
        self.materialize(value.as_bytes(), suffix)
            .map(ResolvedFile::Temporary)
    }

    /// Resolve a list of values, falling back to `single` when the list is empty.
    ///
    /// Order is preserved.
    pub async fn resolve_all(
        &self,
        single: Option<&str>,
        many: &[String],
        suffix: &str,
    ) -> Result<Vec<ResolvedFile>, LocateError> {
        let values: Vec<&str> = if many.is_empty() {
            single.into_iter().collect()
        } else {
            many.iter().map(String::as_str).collect()
        };

        if values.is_empty() {
            return Err(LocateError::Missing);
        }

        let mut resolved = Vec::with_capacity(values.len());
        for value in values {
            resolved.push(self.resolve(value, suffix).await?);
        }
        Ok(resolved)
    }

    fn materialize(&self, content: &[u8], suffix: &str) -> Result<NamedTempFile, LocateError> {
        let temp_err = |source| LocateError::TempFile {
            dir: self.working_dir.to_path_buf(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix("dockhand-")
            .suffix(suffix)
            .tempfile_in(self.working_dir)
            .map_err(temp_err)?;
        file.write_all(content).map_err(temp_err)?;
        file.flush().map_err(temp_err)?;
        Ok(file)
    }
}

/// Multi-line strings are never paths, and joining them would only produce noise.
fn is_plausible_path(value: &str) -> bool {
    !value.contains('\n')
}
