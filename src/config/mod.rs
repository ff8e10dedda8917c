// ABOUTME: Task file types and parsing for dockhand.yml.
// ABOUTME: Handles YAML parsing, discovery, and connection defaults merged per task.

mod connection;
mod deserialize;
mod env_value;
mod init;

pub use connection::{ConnectionConfig, CredentialsConfig, DockerConfigValue};
pub use deserialize::one_or_many;
pub use env_value::{EnvValue, resolve_env_map, resolve_optional};
pub use init::{TEMPLATE, init_config};

use crate::error::{Error, Result};
use crate::tasks::Task;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "dockhand.yml";
pub const CONFIG_FILENAME_ALT: &str = "dockhand.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".dockhand/tasks.yml";

/// Blob store root used when the task file names none, relative to the working directory.
pub const DEFAULT_STORAGE_DIR: &str = ".dockhand/storage";

/// A pipeline step definition: connection defaults plus the tasks to run in order.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskFile {
    /// Directory file inputs resolve against; relative to the task file.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    /// Root of the `storage://` blob store; relative to the working directory.
    #[serde(default)]
    pub storage_root: Option<PathBuf>,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(deserialize_with = "deserialize::deserialize_tasks")]
    pub tasks: NonEmpty<TaskEntry>,
}

/// One task with its optional name and connection override.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskEntry {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub connection: Option<ConnectionConfig>,

    #[serde(flatten)]
    pub task: Task,
}

impl TaskEntry {
    /// Name used in logs and output: the explicit name or the task kind.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.task.kind())
    }
}

impl TaskFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find the task file in `dir`, returning its path.
    pub fn discover(dir: &Path) -> Result<PathBuf> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        candidates
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Working directory, with a relative setting resolved against `base`.
    pub fn working_dir(&self, base: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        }
    }

    pub fn storage_root(&self, working_dir: &Path) -> PathBuf {
        working_dir.join(
            self.storage_root
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_STORAGE_DIR)),
        )
    }

    /// File-level connection with the task's override applied.
    pub fn connection_for(&self, entry: &TaskEntry) -> ConnectionConfig {
        self.connection.merged(entry.connection.as_ref())
    }
}
