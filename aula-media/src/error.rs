//! Error types for media handling.

use thiserror::Error;

/// Errors surfaced by the media toolkit.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Filesystem failure in the working directory.
    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Download of the source media failed at the transport level.
    #[error("media download error: {0}")]
    Http(#[from] reqwest::Error),

    /// The media server answered with a non-success status.
    #[error("media download failed with status {0}")]
    DownloadStatus(u16),

    /// An ffmpeg invocation failed.
    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: i32, stderr: String },

    /// ffmpeg output carried no recognizable duration.
    #[error("could not find a duration in ffmpeg output")]
    DurationNotFound,

    /// Segmentation produced no chunks.
    #[error("audio segmentation produced no chunks")]
    NoChunks,
}

/// Result type alias for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;
