// ABOUTME: Image reference normalization and parsing.
// ABOUTME: Strips transport schemes and splits repository[:tag] without mistaking registry ports for tags.

use std::fmt;
use thiserror::Error;

/// Tag applied when a reference carries none.
pub const DEFAULT_TAG: &str = "latest";

/// Registry assumed when a repository has no host segment.
pub const DEFAULT_REGISTRY: &str = "docker.io";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character {0:?} in image reference: {1}")]
    InvalidChar(char, String),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),

    #[error("digest reference cannot be tagged or pushed: {0}")]
    Digest(String),
}

/// Strip a leading `scheme://` prefix.
///
/// Everything after the first `://` is kept, so the function is idempotent
/// for any input that does not itself embed a second scheme.
pub fn remove_scheme(reference: &str) -> &str {
    match reference.split_once("://") {
        Some((_, rest)) => rest,
        None => reference,
    }
}

/// Split a reference into `(repository, tag)`.
///
/// The last `:` only separates a tag when it comes after the last `/`;
/// `host:5000/app` is a repository on a registry port, not a tag.
/// `name@sha256:…` digests are not understood; callers split them off first.
pub fn split_repo_tag(reference: &str) -> (&str, &str) {
    let last_slash = reference.rfind('/');
    match reference.rfind(':') {
        Some(colon) if last_slash.is_none_or(|slash| colon > slash) => {
            (&reference[..colon], &reference[colon + 1..])
        }
        _ => (reference, DEFAULT_TAG),
    }
}

/// A parsed `repository[:tag]` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    /// Parse a reference, stripping any scheme prefix first.
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = remove_scheme(input.trim());
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input.chars().find(|c| {
            !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
        }) {
            return Err(ParseImageRefError::InvalidChar(c, input.to_string()));
        }

        if input.contains('@') {
            return Err(ParseImageRefError::Digest(input.to_string()));
        }

        let (repository, tag) = split_repo_tag(input);
        if repository.is_empty()
            || tag.is_empty()
            || repository.starts_with('/')
            || repository.ends_with('/')
            || repository.contains("//")
        {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        Ok(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Registry host implied by the repository's first path segment.
    ///
    /// A segment counts as a host when it contains `.` or `:` or is
    /// `localhost`; anything else lives on Docker Hub.
    pub fn registry_host(&self) -> &str {
        match self.repository.split_once('/') {
            Some((first, _))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                first
            }
            _ => DEFAULT_REGISTRY,
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

impl std::str::FromStr for ImageReference {
    type Err = ParseImageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
