//! In-process fakes for every provider trait.
//!
//! Used by tests and by the daemon's offline mode. Fakes are deterministic and
//! record their calls so tests can assert on interaction counts.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::complete::Completer;
use crate::embed::Embedder;
use crate::error::{ProviderError, Result};
use crate::search::{SearchSnippet, WebSearcher};
use crate::transcribe::Transcriber;
use crate::video::{DirectUpload, VideoHost};

fn unavailable(service: &'static str) -> ProviderError {
    ProviderError::Api {
        service,
        status: 503,
        body: "fake provider configured to fail".to_string(),
    }
}

/// Fake video host; hands out `fake://` URLs.
#[derive(Default)]
pub struct FakeVideoHost {
    fail: bool,
}

impl FakeVideoHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A video host whose every call fails.
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl VideoHost for FakeVideoHost {
    async fn create_direct_upload(&self, passthrough: &str) -> Result<DirectUpload> {
        if self.fail {
            return Err(unavailable("video host"));
        }
        Ok(DirectUpload {
            upload_url: format!("fake://uploads/{passthrough}"),
            upload_id: format!("upload-{passthrough}"),
        })
    }

    async fn download_url(&self, asset_id: &str) -> Result<String> {
        if self.fail {
            return Err(unavailable("video host"));
        }
        Ok(format!("fake://assets/{asset_id}/low.mp4"))
    }
}

/// Fake transcriber.
///
/// With a script, chunks consume scripted transcripts in call order; without
/// one, each call returns a transcript derived from the chunk file name.
#[derive(Default)]
pub struct FakeTranscriber {
    script: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail: bool,
}

impl FakeTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the given transcripts, one per call, in order.
    pub fn scripted(transcripts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut script: Vec<String> = transcripts.into_iter().map(Into::into).collect();
        script.reverse();
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// A transcriber whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of transcription calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        if self.fail {
            return Err(unavailable("transcription"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(line) = self.script.lock().await.pop() {
            return Ok(line);
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk".to_string());
        Ok(format!("Transcript of {stem}."))
    }
}

/// Fake embedder producing deterministic unit vectors from the input text.
#[derive(Default)]
pub struct FakeEmbedder {
    calls: AtomicUsize,
    fail: bool,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An embedder whose every call fails.
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    /// Number of embedding calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The deterministic vector this fake produces for `text`.
    pub fn vector_for(text: &str) -> Vec<f32> {
        // FNV-1a over the bytes, spread across a small fixed dimension.
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in text.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        let mut raw = [0.0f32; 8];
        for (i, slot) in raw.iter_mut().enumerate() {
            let shifted = hash.rotate_left((i * 8) as u32) & 0xff;
            *slot = shifted as f32 / 255.0 + 0.01;
        }
        let norm: f32 = raw.iter().map(|v| v * v).sum::<f32>().sqrt();
        raw.iter().map(|v| v / norm).collect()
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, input: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(unavailable("embeddings"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector_for(input))
    }
}

/// Fake completer returning a canned answer and recording prompts.
pub struct FakeCompleter {
    answer: String,
    prompts: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl FakeCompleter {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            prompts: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A completer whose every call fails.
    pub fn failing() -> Self {
        Self {
            answer: String::new(),
            prompts: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    /// All (system, user) prompt pairs seen so far.
    pub async fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl Completer for FakeCompleter {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        if self.fail {
            return Err(unavailable("completions"));
        }
        self.prompts
            .lock()
            .await
            .push((system.to_string(), user.to_string()));
        Ok(self.answer.clone())
    }
}

/// Fake web searcher with fixed results.
#[derive(Default)]
pub struct FakeWebSearcher {
    results: Vec<SearchSnippet>,
    fail: bool,
}

impl FakeWebSearcher {
    pub fn new(results: Vec<SearchSnippet>) -> Self {
        Self {
            results,
            fail: false,
        }
    }

    /// A searcher with no results.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A searcher whose every call fails.
    pub fn failing() -> Self {
        Self {
            results: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl WebSearcher for FakeWebSearcher {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<SearchSnippet>> {
        if self.fail {
            return Err(unavailable("web search"));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_transcriber_returns_lines_in_order() {
        let transcriber = FakeTranscriber::scripted(["Primera parte.", "Segunda parte."]);
        let a = transcriber.transcribe(Path::new("c0.mp3")).await.unwrap();
        let b = transcriber.transcribe(Path::new("c1.mp3")).await.unwrap();
        assert_eq!(a, "Primera parte.");
        assert_eq!(b, "Segunda parte.");
        assert_eq!(transcriber.calls(), 2);
    }

    #[tokio::test]
    async fn embedder_is_deterministic_and_normalized() {
        let embedder = FakeEmbedder::new();
        let a = embedder.embed("Hola.").await.unwrap();
        let b = embedder.embed("Hola.").await.unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn failing_fakes_return_api_errors() {
        let searcher = FakeWebSearcher::failing();
        let err = searcher.search("q", 3).await.unwrap_err();
        assert!(matches!(err, ProviderError::Api { status: 503, .. }));
    }
}
