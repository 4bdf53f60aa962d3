//! Service Layer Error Types
//!
//! This module defines error types for location-tree operations. All of them
//! are caller-recoverable and are returned from the operation that detected
//! them; the service never retries internally.

use thiserror::Error;

/// Inventory group service errors
#[derive(Error, Debug)]
pub enum InventoryGroupServiceError {
    /// Referenced group does not exist (or is soft-deleted)
    #[error("Inventory group not found: {id}")]
    NotFound { id: String },

    /// Malformed or unresolvable input, e.g. a bad `parent_group_id`
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Structural constraint violation, e.g. deleting a group with live children
    #[error("Operation not allowed: {0}")]
    NotAllowed(String),

    /// The underlying store failed
    #[error("Store operation failed: {0}")]
    StoreFailed(#[from] anyhow::Error),
}

impl InventoryGroupServiceError {
    /// Create a not found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a not allowed error
    pub fn not_allowed(msg: impl Into<String>) -> Self {
        Self::NotAllowed(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    pub fn is_not_allowed(&self) -> bool {
        matches!(self, Self::NotAllowed(_))
    }
}

impl From<crate::db::DatabaseError> for InventoryGroupServiceError {
    fn from(err: crate::db::DatabaseError) -> Self {
        Self::StoreFailed(err.into())
    }
}

pub type ServiceResult<T> = Result<T, InventoryGroupServiceError>;
