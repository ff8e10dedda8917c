// ABOUTME: Engine connection and registry credential settings from the task file.
// ABOUTME: Supports per-task overrides and resolves env references into EngineSettings.

use super::env_value::{EnvValue, resolve_optional};
use crate::engine::{DockerConfigSource, EngineSettings, RegistryCredential};
use crate::error::Result;
use serde::Deserialize;

/// `connection:` block, at file level or on a single task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub host: Option<EnvValue>,

    /// Docker-login config: a path, inline JSON, or an inline mapping.
    #[serde(default)]
    pub config: Option<DockerConfigValue>,

    #[serde(default)]
    pub credentials: Option<CredentialsConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DockerConfigValue {
    Text(EnvValue),
    Inline(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub registry: Option<EnvValue>,
    #[serde(default)]
    pub username: Option<EnvValue>,
    #[serde(default)]
    pub password: Option<EnvValue>,
    #[serde(default)]
    pub auth: Option<EnvValue>,
    #[serde(default)]
    pub registry_token: Option<EnvValue>,
    #[serde(default)]
    pub identity_token: Option<EnvValue>,
}

impl CredentialsConfig {
    pub fn resolve(&self) -> Result<RegistryCredential> {
        Ok(RegistryCredential {
            registry: resolve_optional(self.registry.as_ref())?,
            username: resolve_optional(self.username.as_ref())?,
            password: resolve_optional(self.password.as_ref())?,
            auth: resolve_optional(self.auth.as_ref())?,
            registry_token: resolve_optional(self.registry_token.as_ref())?,
            identity_token: resolve_optional(self.identity_token.as_ref())?,
        })
    }
}

impl ConnectionConfig {
    /// Overlay `task` on top of `self`. Each field set on the task wins;
    /// a task's `credentials` block replaces the file-level one as a whole.
    pub fn merged(&self, task: Option<&ConnectionConfig>) -> ConnectionConfig {
        let Some(task) = task else {
            return self.clone();
        };

        ConnectionConfig {
            host: task.host.clone().or_else(|| self.host.clone()),
            config: task.config.clone().or_else(|| self.config.clone()),
            credentials: task
                .credentials
                .clone()
                .or_else(|| self.credentials.clone()),
        }
    }

    /// Resolve env references into settings for opening an Engine session.
    pub fn resolve(&self) -> Result<EngineSettings> {
        let config = match &self.config {
            None => None,
            Some(DockerConfigValue::Inline(value)) => Some(DockerConfigSource::Inline(value.clone())),
            Some(DockerConfigValue::Text(text)) => {
                resolve_optional(Some(text))?.map(|s| DockerConfigSource::from_string(&s))
            }
        };

        Ok(EngineSettings {
            host: resolve_optional(self.host.as_ref())?,
            config,
            credential: self
                .credentials
                .as_ref()
                .map(CredentialsConfig::resolve)
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_override_replaces_set_fields_only() {
        let file: ConnectionConfig = serde_yaml::from_str(
            "host: unix:///var/run/docker.sock\ncredentials:\n  username: ci\n",
        )
        .unwrap();
        let task: ConnectionConfig = serde_yaml::from_str("host: tcp://other:2375\n").unwrap();

        let merged = file.merged(Some(&task));
        assert_eq!(merged.host, Some(EnvValue::from("tcp://other:2375")));
        assert_eq!(merged.credentials, file.credentials);
    }

    #[test]
    fn inline_mapping_config_is_kept_as_json() {
        let conn: ConnectionConfig =
            serde_yaml::from_str("config:\n  auths:\n    ghcr.io:\n      auth: abc\n").unwrap();
        let settings = conn.resolve().unwrap();
        assert!(matches!(
            settings.config,
            Some(DockerConfigSource::Inline(_))
        ));
    }

    #[test]
    fn path_config_is_a_path() {
        let conn: ConnectionConfig =
            serde_yaml::from_str("config: /etc/docker/config.json\n").unwrap();
        let settings = conn.resolve().unwrap();
        assert_eq!(
            settings.config,
            Some(DockerConfigSource::Path("/etc/docker/config.json".into()))
        );
    }
}
