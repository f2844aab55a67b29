//! Error types used across Groundwork.
use serde::Serialize;
use thiserror::Error;

/// High-level error categories for steps, adapters and the runner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing privileges or a required tool is not installed.
    #[error("precondition failed")]
    PreconditionFailed,
    /// A requested package cannot be resolved by the package manager.
    #[error("package unavailable")]
    PackageUnavailable,
    /// Detected corruption that a repair could not clear.
    #[error("state broken")]
    StateBroken,
    /// An external tool reported failure, or the step did not converge.
    #[error("apply failed")]
    ApplyFailed,
    /// Post-apply verification did not pass within the allotted wait.
    #[error("health check failed")]
    HealthCheckFailed,
    #[error("locking")]
    Locking,
    #[error("invalid plan")]
    InvalidPlan,
    #[error("invalid path")]
    InvalidPath,
    #[error("io error")]
    Io,
}

/// Structured error with a kind and human message.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
    /// Kind this error had before it was re-classified with [`escalate`](Self::escalate).
    pub cause: Option<ErrorKind>,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            cause: None,
        }
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionFailed, msg)
    }

    pub fn apply_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ApplyFailed, msg)
    }

    /// Wrap an IO error with the operation and path it came from.
    pub fn io(what: &str, path: &std::path::Path, e: &std::io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("{what} {}: {e}", path.display()))
    }

    /// Re-classify this error, keeping its message and the earliest kind as `cause`.
    #[must_use]
    pub fn escalate(self, kind: ErrorKind) -> Self {
        Self {
            kind,
            msg: self.msg,
            cause: self.cause.or(Some(self.kind)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Io, e.to_string())
    }
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;
