//! Error types for provider clients.

use thiserror::Error;

/// Errors surfaced by vendor API clients.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Client construction was handed unusable configuration.
    #[error("invalid provider configuration: {0}")]
    InvalidConfig(String),

    /// Transport-level failure talking to the vendor.
    #[error("provider transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The vendor answered with a non-success status.
    #[error("{service} request failed ({status}): {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The vendor answered 2xx but the payload was not what we expect.
    #[error("{service} returned an unexpected payload: {detail}")]
    UnexpectedPayload {
        service: &'static str,
        detail: String,
    },

    /// Local file handling failed (reading an audio chunk to upload).
    #[error("provider I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
