//! Storage error types
//!
//! Defines all errors that can occur in the storage layer.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the video store
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite reported a failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed (creating the database directory, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No pooled connection became free within the acquire timeout
    #[error("Timed out after {0:?} waiting for a database connection")]
    PoolTimeout(Duration),

    /// The pool was closed before or while acquiring
    #[error("Connection pool is closed")]
    PoolClosed,

    /// The round-trip exceeded the configured query timeout
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking worker running the statement failed
    #[error("Worker task failed: {0}")]
    Task(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Task(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::PoolClosed;
        assert_eq!(err.to_string(), "Connection pool is closed");

        let err = StorageError::PoolTimeout(Duration::from_millis(250));
        assert_eq!(
            err.to_string(),
            "Timed out after 250ms waiting for a database connection"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let storage_err: StorageError = io_err.into();
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
