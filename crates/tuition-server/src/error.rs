//! Server error types.

use thiserror::Error;
use tuition_core::error::{ConstraintError, Error as CoreError};
use tuition_core::security::SecurityError;

use crate::functions::FunctionError;
use crate::request::error_codes;

/// Server errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Storage, schema, or constraint error from the core.
    #[error(transparent)]
    Storage(#[from] CoreError),

    /// Authentication or authorization failure.
    #[error(transparent)]
    Security(#[from] SecurityError),

    /// A custom operation handler failed.
    #[error("function error: {0}")]
    Function(#[from] FunctionError),

    /// The schema declares no custom operation with this name.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The request was well-formed JSON but not acceptable.
    #[error("bad request: {0}")]
    Request(String),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code reported to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Storage(err) => core_code(err),
            Error::Security(SecurityError::PermissionDenied(_)) => error_codes::FORBIDDEN,
            Error::Security(err) if err.is_authentication() => error_codes::UNAUTHORIZED,
            Error::Security(SecurityError::Storage(err)) => core_code(err),
            Error::Security(_) => error_codes::UNAUTHORIZED,
            Error::Function(_) => error_codes::FUNCTION_ERROR,
            Error::UnknownOperation(_) => error_codes::UNKNOWN_OPERATION,
            Error::Request(_) | Error::Json(_) => error_codes::BAD_REQUEST,
            Error::Database(_) | Error::Transport(_) | Error::Config(_) | Error::Io(_) => {
                error_codes::INTERNAL
            }
        }
    }
}

fn core_code(err: &CoreError) -> &'static str {
    match err {
        CoreError::NotFound => error_codes::NOT_FOUND,
        CoreError::UnknownModel(_) => error_codes::UNKNOWN_MODEL,
        CoreError::ConstraintViolation(ConstraintError::DuplicateIdentifier { .. }) => {
            error_codes::DUPLICATE_IDENTIFIER
        }
        CoreError::ConstraintViolation(
            ConstraintError::ForeignKeyViolation { .. } | ConstraintError::RestrictViolation { .. },
        ) => error_codes::REFERENCE_VIOLATION,
        CoreError::ConstraintViolation(_) => error_codes::VALIDATION_FAILED,
        _ => error_codes::INTERNAL,
    }
}
