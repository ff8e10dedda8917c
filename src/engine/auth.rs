// ABOUTME: Registry credential resolution for pushes and pulls.
// ABOUTME: Turns an explicit credential or a docker-login config file into RegistryAuth for one reference.

use super::traits::RegistryAuth;
use crate::types::ImageReference;
use base64::Engine as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Legacy key Docker Hub credentials are stored under in config files.
const DOCKER_HUB_INDEX: &str = "https://index.docker.io/v1/";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to read docker config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse docker config: {0}")]
    ParseConfig(#[from] serde_json::Error),

    #[error("invalid auth entry for {registry}: {message}")]
    InvalidAuth { registry: String, message: String },

    #[error("credential helper {helper} failed for {registry}: {message}")]
    Helper {
        helper: String,
        registry: String,
        message: String,
    },
}

/// Explicit registry credential, as written in a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCredential {
    /// Registry host; defaults to the host implied by the target reference.
    pub registry: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth: Option<String>,
    pub registry_token: Option<String>,
    pub identity_token: Option<String>,
}

impl RegistryCredential {
    /// Build the auth for `reference`.
    ///
    /// Explicit fields win over anything inferred from the reference.
    pub fn to_auth(&self, reference: &ImageReference) -> RegistryAuth {
        RegistryAuth {
            server_address: Some(
                self.registry
                    .clone()
                    .unwrap_or_else(|| reference.registry_host().to_string()),
            ),
            username: self.username.clone(),
            password: self.password.clone(),
            auth: self.auth.clone(),
            registry_token: self.registry_token.clone(),
            identity_token: self.identity_token.clone(),
        }
    }
}

/// Where a docker-login style config comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum DockerConfigSource {
    /// Already-parsed JSON object.
    Inline(serde_json::Value),
    /// Path to a `config.json`.
    Path(PathBuf),
}

impl DockerConfigSource {
    /// Interpret a string as inline JSON when it looks like an object, else as a path.
    pub fn from_string(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.starts_with('{')
            && let Ok(json) = serde_json::from_str(trimmed)
        {
            return DockerConfigSource::Inline(json);
        }
        DockerConfigSource::Path(expand_home(trimmed))
    }

    pub fn load(&self) -> Result<DockerConfig, AuthError> {
        match self {
            DockerConfigSource::Inline(value) => Ok(serde_json::from_value(value.clone())?),
            DockerConfigSource::Path(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| AuthError::ReadConfig {
                        path: path.clone(),
                        source,
                    })?;
                Ok(serde_json::from_str(&content)?)
            }
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Parsed docker-login config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerConfig {
    #[serde(default)]
    pub auths: HashMap<String, AuthEntry>,
    #[serde(default)]
    pub creds_store: Option<String>,
    #[serde(default)]
    pub cred_helpers: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthEntry {
    pub auth: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub identitytoken: Option<String>,
    pub registrytoken: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    username: String,
    secret: String,
}

impl DockerConfig {
    /// Find the entry for `registry`, trying the spellings `docker login` writes.
    fn entry_for(&self, registry: &str) -> Option<&AuthEntry> {
        let mut keys = vec![
            registry.to_string(),
            format!("https://{registry}"),
            format!("http://{registry}"),
            format!("https://{registry}/v1/"),
        ];
        if registry == crate::types::DEFAULT_REGISTRY {
            keys.push(DOCKER_HUB_INDEX.to_string());
        }
        keys.iter().find_map(|key| self.auths.get(key))
    }

    fn helper_for(&self, registry: &str) -> Option<&str> {
        self.cred_helpers
            .get(registry)
            .or(self.creds_store.as_ref())
            .map(String::as_str)
    }

    /// Auth for `registry`, or `None` if the config has nothing for it.
    pub async fn auth_for(&self, registry: &str) -> Result<Option<RegistryAuth>, AuthError> {
        if let Some(entry) = self.entry_for(registry) {
            let mut auth = RegistryAuth {
                server_address: Some(registry.to_string()),
                username: entry.username.clone(),
                password: entry.password.clone(),
                identity_token: entry.identitytoken.clone(),
                registry_token: entry.registrytoken.clone(),
                ..Default::default()
            };
            if let Some(encoded) = &entry.auth {
                let (username, password) = decode_basic_auth(encoded, registry)?;
                auth.username = Some(username);
                auth.password = Some(password);
            }
            return Ok(Some(auth));
        }

        if let Some(helper) = self.helper_for(registry) {
            return run_helper(helper, registry).await;
        }

        Ok(None)
    }
}

fn decode_basic_auth(encoded: &str, registry: &str) -> Result<(String, String), AuthError> {
    let invalid = |message: String| AuthError::InvalidAuth {
        registry: registry.to_string(),
        message,
    };

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| invalid(format!("not base64: {e}")))?;
    let text = String::from_utf8(decoded).map_err(|e| invalid(format!("not UTF-8: {e}")))?;

    text.split_once(':')
        .map(|(u, p)| (u.to_string(), p.to_string()))
        .ok_or_else(|| invalid("expected username:password".to_string()))
}

async fn run_helper(helper: &str, registry: &str) -> Result<Option<RegistryAuth>, AuthError> {
    let program = format!("docker-credential-{helper}");
    let failed = |message: String| AuthError::Helper {
        helper: program.clone(),
        registry: registry.to_string(),
        message,
    };

    let spawned = Command::new(&program)
        .arg("get")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(helper = %program, registry, "credential helper not installed");
            return Ok(None);
        }
        Err(e) => return Err(failed(e.to_string())),
    };

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(registry.as_bytes())
            .await
            .map_err(|e| failed(e.to_string()))?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        tracing::debug!(
            helper = %program,
            registry,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "credential helper has no entry"
        );
        return Ok(None);
    }

    let response: HelperResponse =
        serde_json::from_slice(&output.stdout).map_err(|e| failed(e.to_string()))?;

    // Helpers report identity tokens with this sentinel username.
    if response.username == "<token>" {
        return Ok(Some(RegistryAuth {
            server_address: Some(registry.to_string()),
            identity_token: Some(response.secret),
            ..Default::default()
        }));
    }

    Ok(Some(RegistryAuth {
        server_address: Some(registry.to_string()),
        username: Some(response.username),
        password: Some(response.secret),
        ..Default::default()
    }))
}

/// Resolves the auth sent with each push or pull.
///
/// | supplied           | effect                                               |
/// |--------------------|------------------------------------------------------|
/// | config             | config entry for the reference's registry            |
/// | credential         | credential fields, registry defaulted from reference |
/// | config, credential | config first; credential if config has no entry      |
/// | neither            | no auth, the Engine uses its own                     |
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    config: Option<DockerConfig>,
    credential: Option<RegistryCredential>,
}

impl CredentialResolver {
    pub fn new(config: Option<DockerConfig>, credential: Option<RegistryCredential>) -> Self {
        Self { config, credential }
    }

    /// Load the config (if any) up front so a broken file fails before any Engine call.
    pub fn load(
        config: Option<&DockerConfigSource>,
        credential: Option<RegistryCredential>,
    ) -> Result<Self, AuthError> {
        let config = config.map(DockerConfigSource::load).transpose()?;
        Ok(Self::new(config, credential))
    }

    pub fn credential(&self) -> Option<&RegistryCredential> {
        self.credential.as_ref()
    }

    /// Auth for pushing or pulling `reference`.
    pub async fn resolve(
        &self,
        reference: &ImageReference,
    ) -> Result<Option<RegistryAuth>, AuthError> {
        if let Some(config) = &self.config {
            let registry = self
                .credential
                .as_ref()
                .and_then(|c| c.registry.as_deref())
                .unwrap_or_else(|| reference.registry_host());
            if let Some(auth) = config.auth_for(registry).await? {
                tracing::debug!(registry, "using docker config credentials");
                return Ok(Some(auth));
            }
        }

        Ok(self.credential.as_ref().map(|c| c.to_auth(reference)))
    }
}
