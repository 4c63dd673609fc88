//! Error types for medcal.

use thiserror::Error;

/// Result type alias using medcal's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for medcal operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No stored event under this key (`calendarId:::eventId`)
    #[error("Event not found: {0}")]
    EventNotFound(String),

    /// No job record with this id
    #[error("Job not found: {0}")]
    JobNotFound(uuid::Uuid),

    /// Illegal job state transition or progress update
    #[error("Job error: {0}")]
    Job(String),

    /// Override entry, filter, or event key failed shape validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Calendar or job store rejected the operation
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
