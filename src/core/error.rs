//! Defines the error taxonomy shared by every backend capability.

use serde::Serialize;
use thiserror::Error;

/// The failure returned by any external collaborator (search, suggest, auth, files).
///
/// The `Display` output of each variant is the message surfaced to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("{0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The request was rejected before it reached the backend, e.g. a missing password.
    #[error("{0}")]
    Validation(String),

    /// The operation needs an authenticated session and there is none.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The caller is authenticated but may not touch the resource.
    #[error("{0}")]
    PermissionDenied(String),

    /// The addressed resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The backend answered with a body that could not be understood.
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// A coarse classification of a `ServiceError`, used by callers that render
/// kind-specific messages (the delete operation in particular).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    PermissionDenied,
    NotFound,
    Validation,
    Unauthenticated,
    Unknown,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            ServiceError::Server { status: 403, .. } => ErrorKind::PermissionDenied,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Server { status: 404, .. } => ErrorKind::NotFound,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Unauthenticated => ErrorKind::Unauthenticated,
            ServiceError::Server { status: 401, .. } => ErrorKind::Unauthenticated,
            _ => ErrorKind::Unknown,
        }
    }

    /// The user-facing message, falling back to `default` when the backend gave none.
    pub fn message_or(&self, default: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            default.to_string()
        } else {
            message
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ServiceError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err.to_string())
    }
}
