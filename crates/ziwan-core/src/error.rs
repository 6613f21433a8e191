use crate::space::UserId;
use thiserror::Error;

/// Result type for space operations.
pub type Result<T> = std::result::Result<T, SpaceError>;

/// Stable, client-facing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    ParamsError = 40000,
    NoAuthError = 40101,
    ForbiddenError = 40300,
    NotFoundError = 40400,
    SystemError = 50000,
    OperationError = 50001,
}

impl ErrorCode {
    pub fn value(self) -> i32 {
        self as i32
    }
}

/// Errors reported by storage backends.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Errors surfaced to callers of the space service.
///
/// Every variant is user-facing and carries a stable [`ErrorCode`].
#[derive(Debug, Clone, Error)]
pub enum SpaceError {
    #[error("invalid parameter: {0}")]
    Param(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("a user may create only one space per type")]
    DuplicateSpace,
    #[error("persistence failed: {0}")]
    Persistence(String),
    #[error("unknown space level: {0}")]
    UnknownTier(i32),
    #[error("timed out waiting for the space creation lock of user {0}")]
    LockTimeout(UserId),
    #[error("space provisioning failed: {0}")]
    Provisioning(String),
}

impl SpaceError {
    /// Returns the stable error code of this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            SpaceError::Param(_) | SpaceError::UnknownTier(_) => ErrorCode::ParamsError,
            SpaceError::Unauthorized(_) => ErrorCode::NoAuthError,
            SpaceError::Forbidden(_) => ErrorCode::ForbiddenError,
            SpaceError::NotFound(_) => ErrorCode::NotFoundError,
            SpaceError::DuplicateSpace | SpaceError::Persistence(_) => ErrorCode::OperationError,
            SpaceError::LockTimeout(_) | SpaceError::Provisioning(_) => ErrorCode::SystemError,
        }
    }
}

impl From<StorageError> for SpaceError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Conflict(_) => SpaceError::DuplicateSpace,
            other => SpaceError::Persistence(other.to_string()),
        }
    }
}
