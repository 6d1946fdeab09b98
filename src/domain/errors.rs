//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

/// Structured error reported by a backend service: an error code plus its message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single backend call, as seen by the retry loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendFailure {
    /// The service answered with a structured error.
    #[error(transparent)]
    Service(#[from] BackendError),

    /// No structured error available (network, serialization, malformed body).
    #[error("{0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum DomainError {
    /// Non-retryable structured error from the knowledge-base backend.
    #[error("Backend error: {0}")]
    Backend(BackendError),

    #[error("Model invocation failed: {0}")]
    Model(String),

    #[error("Knowledge base admin error: {0}")]
    Admin(String),

    #[error("UI error: {0}")]
    Ui(String),
}
