//! Query error types
//!
//! Defines the failures of the interpreter/executor contract. Text that
//! matches no rule is not an error: `interpret` returns `None` instead.

use thiserror::Error;

/// Errors that can occur while building or executing a query descriptor
#[derive(Error, Debug)]
pub enum QueryError {
    /// A required argument is absent from the descriptor
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// An argument is present but cannot be used (bad number, impossible date, ...)
    #[error("Invalid parameter {name}: '{value}'")]
    InvalidParameter { name: &'static str, value: String },

    /// Kind name outside the supported set
    #[error("Unknown query kind: {0}")]
    UnknownQueryKind(String),

    /// The store could not answer
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] crate::storage::StorageError),
}

impl QueryError {
    pub(crate) fn invalid(name: &'static str, value: impl Into<String>) -> Self {
        QueryError::InvalidParameter {
            name,
            value: value.into(),
        }
    }

    /// The user can fix this by rewording the question
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, QueryError::InvalidParameter { .. })
    }

    /// A descriptor reached the executor in a state the interpreter never produces
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            QueryError::MissingParameter(_) | QueryError::UnknownQueryKind(_)
        )
    }
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
