// ABOUTME: Engine connection error types with SNAFU pattern.
// ABOUTME: Unifies client construction, ping and credential failures for programmatic handling.

use snafu::Snafu;

use super::auth::AuthError;
use super::traits::EngineInfoError;

/// Failure to open a usable Engine session.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConnectError {
    #[snafu(display("cannot create Engine client for {host}: {source}"))]
    Connect {
        host: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("Engine unreachable: {source}"))]
    Unreachable { source: EngineInfoError },

    #[snafu(display("registry credentials unusable: {source}"))]
    Credentials { source: AuthError },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectErrorKind {
    /// Host string rejected or socket missing.
    InvalidHost,
    /// Engine did not answer.
    ConnectionFailed,
    /// Docker config or credential helper failed.
    Credentials,
}

impl ConnectError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> ConnectErrorKind {
        match self {
            ConnectError::Connect { .. } => ConnectErrorKind::InvalidHost,
            ConnectError::Unreachable { .. } => ConnectErrorKind::ConnectionFailed,
            ConnectError::Credentials { .. } => ConnectErrorKind::Credentials,
        }
    }

    /// Returns connection error details if the Engine could not be reached.
    pub fn connection_details(&self) -> Option<&str> {
        match self {
            ConnectError::Unreachable {
                source: EngineInfoError::ConnectionFailed(msg),
            } => Some(msg),
            _ => None,
        }
    }
}

impl From<AuthError> for ConnectError {
    fn from(source: AuthError) -> Self {
        ConnectError::Credentials { source }
    }
}

impl From<EngineInfoError> for ConnectError {
    fn from(source: EngineInfoError) -> Self {
        ConnectError::Unreachable { source }
    }
}
