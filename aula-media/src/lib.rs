//! aula-media - local media handling for the processing job
//!
//! Downloads source media into a caller-scoped working directory, probes the
//! duration, and cuts the audio track into fixed-length chunks that fit the
//! transcription service's payload limit. Everything sits behind
//! [`MediaToolkit`] so the pipeline can run without ffmpeg in tests.

mod error;
mod ffmpeg;
mod toolkit;

pub use error::{MediaError, Result};
pub use ffmpeg::FfmpegToolkit;
pub use toolkit::MediaToolkit;
