//! ffmpeg-backed media toolkit.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{MediaError, Result};
use crate::toolkit::MediaToolkit;

/// Media toolkit shelling out to an ffmpeg binary.
#[derive(Clone)]
pub struct FfmpegToolkit {
    http: reqwest::Client,
    ffmpeg: PathBuf,
}

impl FfmpegToolkit {
    /// Build a toolkit using `ffmpeg` from PATH.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }

    /// Use a specific ffmpeg binary.
    #[must_use]
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg = path.into();
        self
    }

    async fn run_ffmpeg(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "Running ffmpeg");
        let output = Command::new(&self.ffmpeg)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(MediaError::Ffmpeg {
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }
        Ok(stderr)
    }
}

/// Parse `Duration: HH:MM:SS.cs` out of ffmpeg's banner output.
fn parse_duration(ffmpeg_output: &str) -> Option<f64> {
    let rest = ffmpeg_output.split("Duration: ").nth(1)?;
    let stamp = rest.split([',', '\n']).next()?.trim();
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.trim().parse().ok()?;
    let minutes: f64 = parts.next()?.trim().parse().ok()?;
    let seconds: f64 = parts.next()?.trim().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(MediaError::DownloadStatus(status.as_u16()));
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = resp.bytes_stream();
        let mut total = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            total += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        debug!(bytes = total, dest = %dest.display(), "Downloaded source media");
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        // `ffmpeg -i` with no output exits nonzero but still prints the
        // banner with the duration; read stderr in both cases.
        let path_str = path.to_string_lossy();
        let stderr = match self.run_ffmpeg(&["-hide_banner", "-i", &path_str]).await {
            Ok(out) => out,
            Err(MediaError::Ffmpeg { stderr, .. }) => stderr,
            Err(e) => return Err(e),
        };
        parse_duration(&stderr).ok_or(MediaError::DurationNotFound)
    }

    async fn segment_audio(
        &self,
        path: &Path,
        out_dir: &Path,
        chunk_seconds: u64,
    ) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(out_dir).await?;
        let pattern = out_dir.join("chunk_%03d.mp3");
        let path_str = path.to_string_lossy();
        let pattern_str = pattern.to_string_lossy();
        let chunk = chunk_seconds.to_string();

        self.run_ffmpeg(&[
            "-y",
            "-hide_banner",
            "-i",
            &path_str,
            "-vn",
            "-acodec",
            "libmp3lame",
            "-ab",
            "64k",
            "-f",
            "segment",
            "-segment_time",
            &chunk,
            &pattern_str,
        ])
        .await?;

        let mut chunks = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if entry_path.extension().is_some_and(|ext| ext == "mp3") {
                chunks.push(entry_path);
            }
        }
        if chunks.is_empty() {
            return Err(MediaError::NoChunks);
        }
        // %03d numbering makes lexicographic order the temporal order.
        chunks.sort();
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_banner_duration() {
        let out = "Input #0, mov,mp4, from 'clase.mp4':\n  Duration: 00:10:03.52, start: 0.000000, bitrate: 812 kb/s\n";
        let secs = parse_duration(out).unwrap();
        assert!((secs - 603.52).abs() < 1e-6);
    }

    #[test]
    fn parses_hour_long_duration() {
        let out = "  Duration: 01:02:03.00, start: 0.0\n";
        assert_eq!(parse_duration(out), Some(3723.0));
    }

    #[test]
    fn missing_duration_yields_none() {
        assert_eq!(parse_duration("no banner here"), None);
        assert_eq!(parse_duration("Duration: N/A,"), None);
    }
}
