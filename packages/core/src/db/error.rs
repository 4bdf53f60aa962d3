//! Database Error Types
//!
//! This module defines error types for database operations, providing
//! clear error handling for connection, filesystem and query failures.

use std::path::PathBuf;
use thiserror::Error;

/// Database operation errors
///
/// Covers connection, filesystem and SQL execution failures of the
/// libsql backend. Business-rule failures are handled by the service-layer
/// error type.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish database connection
    #[error("Failed to connect to database at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        source: libsql::Error,
    },

    /// Permission denied when accessing database
    #[error("Permission denied for database path: {path}")]
    PermissionDenied { path: PathBuf },

    /// Failed to create parent directory
    #[error("Failed to create parent directory for database: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    /// libsql operation error
    #[error("Database operation failed: {0}")]
    LibsqlError(#[from] libsql::Error),

    /// SQL execution error with context
    #[error("SQL execution failed: {context}")]
    SqlExecutionError { context: String },

    /// A stored row could not be converted back into a group
    #[error("Failed to decode row: {0}")]
    RowDecodeFailed(String),
}

impl DatabaseError {
    /// Create a connection failed error
    pub fn connection_failed(path: PathBuf, source: libsql::Error) -> Self {
        Self::ConnectionFailed { path, source }
    }

    /// Create a permission denied error
    pub fn permission_denied(path: PathBuf) -> Self {
        Self::PermissionDenied { path }
    }

    /// Create a SQL execution error with context
    pub fn sql_execution(context: impl Into<String>) -> Self {
        Self::SqlExecutionError {
            context: context.into(),
        }
    }

    pub fn row_decode(msg: impl Into<String>) -> Self {
        Self::RowDecodeFailed(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_execution_message() {
        let err = DatabaseError::sql_execution("Failed to shift ranks: locked");
        assert_eq!(
            err.to_string(),
            "SQL execution failed: Failed to shift ranks: locked"
        );
    }

    #[test]
    fn test_permission_denied_message() {
        let err = DatabaseError::permission_denied(PathBuf::from("/root/locked.db"));
        assert_eq!(
            err.to_string(),
            "Permission denied for database path: /root/locked.db"
        );
    }

    #[test]
    fn test_row_decode_message() {
        let err = DatabaseError::row_decode("bad metadata");
        assert_eq!(err.to_string(), "Failed to decode row: bad metadata");
    }
}
