//! Storage error types.

use turnstile_core::PipelineError;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity was not found.
    #[error("Entity not found: {resource_type}/{id}")]
    NotFound {
        /// The resource type of the missing entity.
        resource_type: String,
        /// The id of the missing entity.
        id: String,
    },

    /// The mutation collides with existing state: a duplicate id or a
    /// declared unique field already holding the value.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the collision.
        message: String,
    },

    /// The backend itself failed.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the backend failure.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a conflict error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl From<StorageError> for PipelineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { resource_type, id } => {
                PipelineError::NotFound { resource_type, id }
            }
            StorageError::Conflict { message } => PipelineError::Conflict { message },
            StorageError::Backend { message } => {
                // Full detail is for the log, not the caller.
                tracing::error!(%message, "storage backend failure");
                PipelineError::internal("storage backend failure")
            }
        }
    }
}
