//! The media toolkit trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// Local media operations needed by the processing job.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Download the media at `url` to the file `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;

    /// Probe the duration of the media file, in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Extract the audio track and cut it into chunks of at most
    /// `chunk_seconds`, written under `out_dir`. Returned paths are in
    /// temporal order.
    async fn segment_audio(
        &self,
        path: &Path,
        out_dir: &Path,
        chunk_seconds: u64,
    ) -> Result<Vec<PathBuf>>;
}
