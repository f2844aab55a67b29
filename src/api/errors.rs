use thiserror::Error;

use crate::types::errors::{Error as StepError, ErrorKind};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    #[error("locking: {0}")]
    Locking(String),
    #[error("filesystem error: {0}")]
    FilesystemError(String),
    #[error("step error: {0}")]
    Step(StepError),
}

impl ApiError {
    #[must_use]
    pub fn error_id(&self) -> ErrorId {
        match self {
            ApiError::InvalidPlan(_) => ErrorId::E_PLAN,
            ApiError::Locking(_) => ErrorId::E_LOCKING,
            ApiError::FilesystemError(_) => ErrorId::E_GENERIC,
            ApiError::Step(e) => e.kind.into(),
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        exit_code_for(self.error_id())
    }
}

impl From<StepError> for ApiError {
    fn from(e: StepError) -> Self {
        match e.kind {
            ErrorKind::InvalidPlan => ApiError::InvalidPlan(e.msg),
            ErrorKind::Locking => ApiError::Locking(e.msg),
            ErrorKind::InvalidPath | ErrorKind::Io => ApiError::FilesystemError(e.msg),
            _ => ApiError::Step(e),
        }
    }
}

/// Chain of stable ids for a failure: the primary id first, then the kind it halted as
/// when that differs (an unavailable mandatory package reports both).
#[must_use]
pub fn summary_error_ids(primary: ErrorId, kind: ErrorKind) -> Vec<&'static str> {
    let halted: ErrorId = kind.into();
    if halted == primary {
        vec![id_str(primary)]
    } else {
        vec![id_str(primary), id_str(halted)]
    }
}

// Stable identifiers; SCREAMING_SNAKE_CASE matches the emitted IDs.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_PRECONDITION,
    E_PACKAGE_UNAVAILABLE,
    E_STATE_BROKEN,
    E_APPLY_FAILED,
    E_HEALTH,
    E_LOCKING,
    E_PLAN,
    E_GENERIC,
}

impl From<ErrorKind> for ErrorId {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::PreconditionFailed => ErrorId::E_PRECONDITION,
            ErrorKind::PackageUnavailable => ErrorId::E_PACKAGE_UNAVAILABLE,
            ErrorKind::StateBroken => ErrorId::E_STATE_BROKEN,
            ErrorKind::ApplyFailed => ErrorId::E_APPLY_FAILED,
            ErrorKind::HealthCheckFailed => ErrorId::E_HEALTH,
            ErrorKind::Locking => ErrorId::E_LOCKING,
            ErrorKind::InvalidPlan => ErrorId::E_PLAN,
            ErrorKind::InvalidPath | ErrorKind::Io => ErrorId::E_GENERIC,
        }
    }
}

/// Primary id for a step failure. Unavailable mandatory packages halt as `ApplyFailed` but
/// keep their own id so the exit code names the cause.
#[must_use]
pub fn primary_error_id(e: &StepError) -> ErrorId {
    match (e.kind, e.cause) {
        (ErrorKind::ApplyFailed, Some(ErrorKind::PackageUnavailable)) => {
            ErrorId::E_PACKAGE_UNAVAILABLE
        }
        (kind, _) => kind.into(),
    }
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_PRECONDITION => "E_PRECONDITION",
        ErrorId::E_PACKAGE_UNAVAILABLE => "E_PACKAGE_UNAVAILABLE",
        ErrorId::E_STATE_BROKEN => "E_STATE_BROKEN",
        ErrorId::E_APPLY_FAILED => "E_APPLY_FAILED",
        ErrorId::E_HEALTH => "E_HEALTH",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_PLAN => "E_PLAN",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_PRECONDITION => 10,
        ErrorId::E_PACKAGE_UNAVAILABLE => 20,
        ErrorId::E_STATE_BROKEN => 30,
        ErrorId::E_APPLY_FAILED => 40,
        ErrorId::E_HEALTH => 50,
        ErrorId::E_LOCKING => 60,
        ErrorId::E_PLAN => 70,
        ErrorId::E_GENERIC => 1,
    }
}

const ALL_IDS: [ErrorId; 8] = [
    ErrorId::E_PRECONDITION,
    ErrorId::E_PACKAGE_UNAVAILABLE,
    ErrorId::E_STATE_BROKEN,
    ErrorId::E_APPLY_FAILED,
    ErrorId::E_HEALTH,
    ErrorId::E_LOCKING,
    ErrorId::E_PLAN,
    ErrorId::E_GENERIC,
];

#[must_use]
pub fn parse_id(s: &str) -> Option<ErrorId> {
    ALL_IDS.into_iter().find(|id| id_str(*id) == s)
}

#[must_use]
pub fn exit_code_for_id_str(s: &str) -> Option<i32> {
    parse_id(s).map(exit_code_for)
}
