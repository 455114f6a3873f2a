//! Error types for the job log.

/// Error type for job log operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filesystem failure while reading or writing the log.
    #[error("job log I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log entry could not be encoded or decoded.
    #[error("job log codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Result type alias for job log operations.
pub type Result<T> = std::result::Result<T, Error>;
