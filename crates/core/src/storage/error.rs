//! Storage error types.

use mediakit_shared::{AppError, DriverKind};
use thiserror::Error;

/// Result type alias using `StorageError`.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File not found in storage.
    #[error("file not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Operation not offered by the backend.
    #[error("{operation} is not supported by the {driver} driver")]
    Unsupported {
        /// Driver that refused.
        driver: DriverKind,
        /// Refused operation.
        operation: &'static str,
    },

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Name escapes the storage namespace.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// No free name found within the attempt budget.
    #[error("no available name for '{name}' after {attempts} attempts")]
    NameCollisionExhausted {
        /// Requested name.
        name: String,
        /// Candidates tried.
        attempts: usize,
    },

    /// Upload session could not be opened.
    #[error("upload negotiation failed: {0}")]
    Negotiation(String),

    /// Backend operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// Local I/O error.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an unsupported operation error.
    #[must_use]
    pub fn unsupported(driver: DriverKind, operation: &'static str) -> Self {
        Self::Unsupported { driver, operation }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid key error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey(key.into())
    }

    /// Create a negotiation error.
    #[must_use]
    pub fn negotiation(msg: impl Into<String>) -> Self {
        Self::Negotiation(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::Unsupported {
                driver: DriverKind::ObjectStore,
                operation: "operation",
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        let msg = err.to_string();
        match err {
            StorageError::NotFound { .. } => Self::NotFound(msg),
            StorageError::Unsupported { .. } => Self::Forbidden(msg),
            StorageError::InvalidKey(_) => Self::Validation(msg),
            StorageError::NameCollisionExhausted { .. } => Self::Conflict(msg),
            StorageError::Configuration(_) => Self::Configuration(msg),
            StorageError::Negotiation(_) | StorageError::Operation(_) => {
                Self::ExternalService(msg)
            }
            StorageError::Io(_) => Self::Internal(msg),
        }
    }
}
