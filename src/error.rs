use thiserror::Error;

/// Error type for dbresult operations
#[derive(Debug, Error)]
pub enum DbResultError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Result has expired: its resources were released or its connection is gone")]
    ResourceExpired,

    #[error("Malformed binding set: {0}")]
    MalformedBindingSet(String),

    #[error("Backend execution failed: {0}")]
    BackendExecutionFailure(String),

    #[error("Usage sequence violation: {0}")]
    UsageSequenceViolation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type alias for dbresult operations
pub type Result<T> = std::result::Result<T, DbResultError>;
