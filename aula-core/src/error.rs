//! Error types for aula-core

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced lesson does not exist.
    #[error("lesson not found: {0}")]
    LessonNotFound(Uuid),

    /// The referenced route assignment does not exist.
    #[error("student {student_id} is not assigned to route {ruta_id}")]
    AssignmentNotFound { student_id: String, ruta_id: String },

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
