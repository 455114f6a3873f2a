//! Error types for the processing worker.

use thiserror::Error;
use uuid::Uuid;

/// Errors that abort a processing run.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The lesson to process does not exist.
    #[error("lesson not found: {0}")]
    LessonNotFound(Uuid),

    /// The store rejected a read or write.
    #[error("store error: {0}")]
    Store(#[from] aula_core::StoreError),

    /// A vendor API call failed.
    #[error("provider error: {0}")]
    Provider(#[from] aula_providers::ProviderError),

    /// Local media handling failed.
    #[error("media error: {0}")]
    Media(#[from] aula_media::MediaError),

    /// Working directory handling failed.
    #[error("working directory error: {0}")]
    Workdir(#[from] std::io::Error),
}

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;
