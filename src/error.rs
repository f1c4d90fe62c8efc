//! Error handling module
//!
//! Provides the unified error type for the review core. Only conditions that
//! abort a whole call surface here; per-statement coverage gaps (no primary
//! key, unnamed index, multi-table DML) are represented as empty findings or
//! empty rollback entries, never as errors.

use thiserror::Error;

/// Review-core error type
#[derive(Error, Debug)]
pub enum ReviewError {
    /// The SQL text could not be parsed. Fatal for the batch.
    #[error("SQL syntax error: {0}")]
    Syntax(String),

    /// The catalog or data source is unreachable. Propagated as-is, never
    /// retried internally and never treated as "object does not exist".
    #[error("catalog source unavailable: {0}")]
    RemoteUnavailable(String),
}

impl From<sqlparser::parser::ParserError> for ReviewError {
    fn from(e: sqlparser::parser::ParserError) -> Self {
        ReviewError::Syntax(e.to_string())
    }
}

/// Result type alias for review operations
pub type ReviewResult<T> = Result<T, ReviewError>;

/// Helper function to create a remote-unavailable error
pub fn remote_error(msg: impl Into<String>) -> ReviewError {
    ReviewError::RemoteUnavailable(msg.into())
}
