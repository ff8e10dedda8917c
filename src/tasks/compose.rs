// ABOUTME: The compose task: locates compose files and runs `docker compose` as a child process.
// ABOUTME: One `-f <path>` per located file, in order, then the project name and user args.

use super::TaskOutput;
use crate::config::one_or_many;
use crate::engine::Connector;
use crate::error::{Error, Result};
use crate::locator::{COMPOSE_SUFFIX, FileLocator};
use crate::pipeline::Workspace;
use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeTask {
    /// Single compose file; ignored when `compose_files` is non-empty.
    #[serde(default)]
    pub compose_file: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub compose_files: Vec<String>,

    #[serde(default)]
    pub project_name: Option<String>,

    /// Arguments after the file flags, e.g. `[up, -d]`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub args: Vec<String>,
}

/// Arguments passed to `docker`.
pub fn compose_args<P: AsRef<Path>>(
    files: &[P],
    project_name: Option<&str>,
    args: &[String],
) -> Vec<String> {
    let mut argv = vec!["compose".to_string()];
    for file in files {
        argv.push("-f".to_string());
        argv.push(file.as_ref().display().to_string());
    }
    if let Some(name) = project_name.map(str::trim).filter(|n| !n.is_empty()) {
        argv.push("-p".to_string());
        argv.push(name.to_string());
    }
    argv.extend(args.iter().cloned());
    argv
}

impl ComposeTask {
    pub async fn run<C: Connector>(
        &self,
        workspace: &Workspace<'_>,
        connector: &C,
    ) -> Result<TaskOutput> {
        let locator = FileLocator::new(workspace.working_dir, workspace.store);
        let files = locator
            .resolve_all(self.compose_file.as_deref(), &self.compose_files, COMPOSE_SUFFIX)
            .await?;
        let paths: Vec<&Path> = files.iter().map(|f| f.path()).collect();
        let argv = compose_args(&paths, self.project_name.as_deref(), &self.args);

        let mut command = Command::new("docker");
        command.args(&argv).current_dir(workspace.working_dir);
        if let Some(host) = connector.docker_host() {
            command.env("DOCKER_HOST", host);
        }

        tracing::info!(args = ?argv, "running docker compose");
        let output = command.output().await?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!("{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            tracing::warn!("{}", line);
        }

        if !output.status.success() {
            return Err(Error::Compose {
                status: output.status.to_string(),
            });
        }

        // `files` owns any temporary compose files; keep them until the process exits.
        drop(files);
        Ok(TaskOutput::Compose {
            exit_code: output.status.code().unwrap_or(0),
        })
    }
}
