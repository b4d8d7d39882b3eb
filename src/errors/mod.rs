//! Error handling module for the portal client.
//!
//! Provides the error taxonomy surfaced by the session store and the resource services.
//! Views are the only place errors are turned into user-visible text.

use reqwest::StatusCode;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Login failed or no user is logged in
    InvalidCredentials(String),
    /// Missing record or id
    NotFound(String),
    /// Client-side field checks failed before any network call
    Validation(String),
    /// Business-rule rejection (duplicate, full capacity, delete with children)
    Conflict(String),
    /// Request rejected, timed out, or answered with an unmapped status
    Network(String),
    /// Local durable storage could not be read or written
    Storage(String),
    /// Anything else
    Internal(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials(_) => codes::INVALID_CREDENTIALS,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Network(_) => codes::NETWORK_ERROR,
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidCredentials(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Network(msg)
            | AppError::Storage(msg)
            | AppError::Internal(msg) => msg,
        }
    }

    /// Map a non-success status from the remote store.
    ///
    /// Only 404 and 409 carry meaning for a document store; everything else is a
    /// transport-level failure from the caller's point of view.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => AppError::NotFound(format!("{} not found", context)),
            StatusCode::CONFLICT => AppError::Conflict(format!("{} was rejected", context)),
            other => AppError::Network(format!("{}: HTTP error {}", context, other.as_u16())),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Network error: {:?}", err);
        if err.is_decode() {
            return AppError::Internal(format!("Malformed response: {}", err));
        }
        match err.status() {
            Some(status) => AppError::from_status(status, "Request"),
            None => AppError::Network(format!("Network error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("Storage error: {:?}", err);
        AppError::Storage(format!("Storage error: {}", err))
    }
}

/// Result alias used across the crate.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            AppError::from_status(StatusCode::NOT_FOUND, "Course 7"),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::CONFLICT, "Course 7"),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "Course 7"),
            AppError::Network(_)
        ));
    }

    #[test]
    fn test_display_includes_code() {
        let err = AppError::Conflict("El curso está completo".to_string());
        assert_eq!(err.to_string(), "CONFLICT: El curso está completo");
        assert_eq!(err.error_code(), codes::CONFLICT);
    }
}
