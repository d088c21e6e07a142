//! Error types for kinship.

use thiserror::Error;

/// Result type alias using kinship's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for kinship operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input failed a shape check (out-of-range rating, malformed email).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The external store was unavailable or rejected the operation
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A stored record is structurally corrupt (e.g. missing a dimension)
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    ProfileNotFound(uuid::Uuid),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error belongs to the persistence class (store faults and
    /// integrity faults in stored data), as opposed to caller input errors.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Persistence(_) | Error::Integrity(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
