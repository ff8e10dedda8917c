// ABOUTME: Task file scaffolding for new projects.
// ABOUTME: Creates a dockhand.yml template with a build-and-push task.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ImageReference;

use super::CONFIG_FILENAME;

/// Template written by `dockhand init`; `{image}` is replaced with the target image.
pub const TEMPLATE: &str = r#"working_dir: .
connection:
  # host: unix:///var/run/docker.sock
  # config: ~/.docker/config.json
  credentials:
    username: { env: REGISTRY_USER }
    password: { env: REGISTRY_PASSWORD }
tasks:
  - type: build
    dockerfile: Dockerfile
    tags:
      - {image}
    push: false
"#;

/// Write a template task file into `dir` and return its path.
pub fn init_config(dir: &Path, image: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let image = match image {
        Some(i) => ImageReference::parse(i)?,
        None => ImageReference::parse("registry.example.com/my-app:latest")?,
    };

    std::fs::write(&config_path, TEMPLATE.replace("{image}", &image.to_string()))?;
    tracing::info!(path = %config_path.display(), "wrote task file template");

    Ok(config_path)
}
