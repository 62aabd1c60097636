//! Error types for SemDiff core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer will map these
//! to user-friendly messages.

use thiserror::Error;

/// Result type alias for SemDiff operations.
pub type Result<T> = std::result::Result<T, SemdiffError>;

/// Core error type for SemDiff operations.
#[derive(Debug, Error)]
pub enum SemdiffError {
    /// Data validation error (bad input, malformed import, invalid seat layout)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Identity collision (e.g. renaming a student onto an existing id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Schema upgrade failure
    #[error("Migration error: {0}")]
    Migration(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// CSV encoding/decoding error
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Remote sync endpoint error
    #[error("Transport error: {0}")]
    Transport(String),
}

impl SemdiffError {
    /// True for errors caused by caller input rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SemdiffError::Validation(_) | SemdiffError::NotFound(_) | SemdiffError::Conflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_classification() {
        assert!(SemdiffError::Conflict("id 4 exists".into()).is_user_error());
        assert!(SemdiffError::NotFound("student 9".into()).is_user_error());
        assert!(!SemdiffError::Storage("disk".into()).is_user_error());
    }

    #[test]
    fn test_sqlite_error_converts() {
        let err: SemdiffError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(err.to_string().starts_with("SQLite error"));
    }
}
