//! The processing pipeline: source media in, passage rows out.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use aula_core::store::Store;
use aula_core::{Passage, SegmentationPolicy};
use aula_media::MediaToolkit;
use aula_providers::{Embedder, Transcriber, VideoHost};

use crate::error::{Result, WorkerError};

/// Tunables for a processing run.
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Chunk length in seconds; bounded by the transcription service's
    /// payload limit.
    pub chunk_seconds: u64,
    /// How many embedding requests may be in flight at once. Transcription
    /// stays strictly sequential regardless (transcript order matters);
    /// embedding has no ordering requirement.
    pub embed_concurrency: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: 600,
            embed_concurrency: 4,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingSummary {
    pub passages: usize,
    pub chunks: usize,
    pub duration_seconds: u64,
}

/// The transcription/embedding pipeline for one lesson.
///
/// Every dependency is an injected handle; the entry point owns their
/// lifecycles. The first failing step aborts the run and is logged with the
/// lesson id for manual re-triggering; passages already written stay.
pub struct ProcessingPipeline {
    store: Arc<dyn Store>,
    video: Arc<dyn VideoHost>,
    media: Arc<dyn MediaToolkit>,
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    segmenter: Arc<dyn SegmentationPolicy>,
    config: ProcessingConfig,
}

impl ProcessingPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        video: Arc<dyn VideoHost>,
        media: Arc<dyn MediaToolkit>,
        transcriber: Arc<dyn Transcriber>,
        embedder: Arc<dyn Embedder>,
        segmenter: Arc<dyn SegmentationPolicy>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            store,
            video,
            media,
            transcriber,
            embedder,
            segmenter,
            config,
        }
    }

    /// Run the pipeline for one lesson.
    ///
    /// The scoped working directory is released on every exit path: it lives
    /// in a `TempDir` whose Drop removes it on success, error, and early
    /// return alike.
    pub async fn run(&self, lesson_id: Uuid, asset_id: &str) -> Result<ProcessingSummary> {
        let lesson = self
            .store
            .lesson(lesson_id)
            .await?
            .ok_or(WorkerError::LessonNotFound(lesson_id))?;
        info!(lesson_id = %lesson_id, titulo = %lesson.titulo, "Processing lesson");

        let workdir = tempfile::tempdir()?;

        // 1. Resolve the signed download URL and fetch the source media.
        let url = self.video.download_url(asset_id).await?;
        let source = workdir.path().join("source.mp4");
        self.media.fetch(&url, &source).await?;

        // 2. Probe the duration and persist it.
        let duration = self.media.probe_duration(&source).await?;
        self.store.set_lesson_duration(lesson_id, duration).await?;

        // 3. Cut the audio track into fixed-length chunks.
        let chunk_dir = workdir.path().join("chunks");
        let chunks = self
            .media
            .segment_audio(&source, &chunk_dir, self.config.chunk_seconds)
            .await?;
        info!(lesson_id = %lesson_id, chunks = chunks.len(), "Segmented audio");

        // 4.-5. Transcribe strictly in order and concatenate. Chunk N+1 only
        // starts once chunk N finished, so the transcript stays coherent.
        let mut parts = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            info!(lesson_id = %lesson_id, chunk = i, "Transcribing chunk");
            let text = self.transcriber.transcribe(chunk).await?;
            parts.push(text.trim().to_string());
        }
        let transcript = parts.join(" ");

        // 6. Split into passages.
        let fragments = self.segmenter.split(&transcript);
        if fragments.is_empty() {
            warn!(lesson_id = %lesson_id, "Transcript produced no passages");
        }

        // 7. Replace the lesson's passages: clear, embed, persist. Clearing
        // first makes manual re-triggers idempotent instead of duplicating.
        let removed = self.store.delete_passages(lesson_id).await?;
        if removed > 0 {
            info!(lesson_id = %lesson_id, removed, "Cleared passages from previous run");
        }

        let embedder = Arc::clone(&self.embedder);
        let embeddings: Vec<Vec<f32>> = stream::iter(fragments.iter().cloned().map(|text| {
            let embedder = Arc::clone(&embedder);
            async move { embedder.embed(&text).await }
        }))
        .buffered(self.config.embed_concurrency.max(1))
        .try_collect()
        .await?;

        for (seq, (text, embedding)) in fragments.iter().zip(embeddings).enumerate() {
            self.store
                .insert_passage(Passage::new(lesson_id, seq, text.clone(), embedding))
                .await?;
        }

        let summary = ProcessingSummary {
            passages: fragments.len(),
            chunks: chunks.len(),
            duration_seconds: duration.round() as u64,
        };
        info!(
            lesson_id = %lesson_id,
            passages = summary.passages,
            duration_seconds = summary.duration_seconds,
            "Processing complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use aula_core::{MemoryStore, PassageStore, SentenceSplitter};
    use aula_core::{Lesson, LessonStore};
    use aula_media::{MediaError, MediaToolkit};
    use aula_providers::fake::{FakeEmbedder, FakeTranscriber, FakeVideoHost};

    /// Toolkit that fabricates chunk files without touching ffmpeg.
    struct FakeToolkit {
        chunks: usize,
        duration: f64,
        /// Directory the source was fetched into; lets tests check the
        /// pipeline's workdir is gone after a run.
        workdir: Mutex<Option<PathBuf>>,
        fail_probe: bool,
    }

    impl FakeToolkit {
        fn new(chunks: usize, duration: f64) -> Self {
            Self {
                chunks,
                duration,
                workdir: Mutex::new(None),
                fail_probe: false,
            }
        }

        fn failing_probe() -> Self {
            Self {
                chunks: 1,
                duration: 0.0,
                workdir: Mutex::new(None),
                fail_probe: true,
            }
        }

        fn recorded_workdir(&self) -> Option<PathBuf> {
            self.workdir.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaToolkit for FakeToolkit {
        async fn fetch(&self, _url: &str, dest: &Path) -> aula_media::Result<()> {
            tokio::fs::write(dest, b"video-bytes").await?;
            *self.workdir.lock().unwrap() = dest.parent().map(Path::to_path_buf);
            Ok(())
        }

        async fn probe_duration(&self, _path: &Path) -> aula_media::Result<f64> {
            if self.fail_probe {
                return Err(MediaError::DurationNotFound);
            }
            Ok(self.duration)
        }

        async fn segment_audio(
            &self,
            _path: &Path,
            out_dir: &Path,
            _chunk_seconds: u64,
        ) -> aula_media::Result<Vec<PathBuf>> {
            tokio::fs::create_dir_all(out_dir).await?;
            let mut paths = Vec::new();
            for i in 0..self.chunks {
                let path = out_dir.join(format!("chunk_{i:03}.mp3"));
                tokio::fs::write(&path, b"audio").await?;
                paths.push(path);
            }
            Ok(paths)
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        toolkit: Arc<FakeToolkit>,
        transcriber: Arc<FakeTranscriber>,
        embedder: Arc<FakeEmbedder>,
        pipeline: ProcessingPipeline,
        lesson_id: Uuid,
    }

    async fn fixture(toolkit: FakeToolkit, transcriber: FakeTranscriber) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let lesson = Lesson::new("Clase uno", "Presente simple", "ruta-1");
        let lesson_id = lesson.id;
        store.insert_lesson(lesson).await.unwrap();

        let toolkit = Arc::new(toolkit);
        let transcriber = Arc::new(transcriber);
        let embedder = Arc::new(FakeEmbedder::new());
        let pipeline = ProcessingPipeline::new(
            store.clone(),
            Arc::new(FakeVideoHost::new()),
            toolkit.clone(),
            transcriber.clone(),
            embedder.clone(),
            Arc::new(SentenceSplitter),
            ProcessingConfig::default(),
        );

        Fixture {
            store,
            toolkit,
            transcriber,
            embedder,
            pipeline,
            lesson_id,
        }
    }

    #[tokio::test]
    async fn end_to_end_three_sentences_three_rows() {
        let fx = fixture(
            FakeToolkit::new(1, 120.0),
            FakeTranscriber::scripted(["Hello. This is class one. Goodbye."]),
        )
        .await;

        let summary = fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap();
        assert_eq!(summary.passages, 3);
        assert_eq!(summary.chunks, 1);
        assert_eq!(fx.embedder.calls(), 3);

        let rows = fx.store.passages(fx.lesson_id).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].text, "Hello.");
        assert_eq!(rows[1].text, "This is class one.");
        assert_eq!(rows[2].text, "Goodbye.");
        assert!(rows.iter().all(|p| p.lesson_id == fx.lesson_id));
    }

    #[tokio::test]
    async fn chunks_are_concatenated_in_order() {
        let fx = fixture(
            FakeToolkit::new(3, 1800.0),
            FakeTranscriber::scripted(["First part.", "Second part.", "Third part."]),
        )
        .await;

        fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap();
        assert_eq!(fx.transcriber.calls(), 3);

        let rows = fx.store.passages(fx.lesson_id).await.unwrap();
        let texts: Vec<&str> = rows.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["First part.", "Second part.", "Third part."]);
    }

    #[tokio::test]
    async fn duration_is_persisted() {
        let fx = fixture(FakeToolkit::new(1, 603.5), FakeTranscriber::new()).await;

        fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap();

        let lesson = fx.store.lesson(fx.lesson_id).await.unwrap().unwrap();
        assert_eq!(lesson.duration_seconds, Some(603.5));
    }

    #[tokio::test]
    async fn rerun_replaces_passages_instead_of_duplicating() {
        let fx = fixture(
            FakeToolkit::new(1, 60.0),
            FakeTranscriber::scripted(["Hola. Adiós.", "Hola otra vez. Adiós."]),
        )
        .await;

        fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap();
        fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap();

        let rows = fx.store.passages(fx.lesson_id).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "Hola otra vez.");
    }

    #[tokio::test]
    async fn failing_step_aborts_before_transcription() {
        let fx = fixture(FakeToolkit::failing_probe(), FakeTranscriber::new()).await;

        let err = fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap_err();
        assert!(matches!(err, WorkerError::Media(_)));
        assert_eq!(fx.transcriber.calls(), 0);
        assert!(fx.store.passages(fx.lesson_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn workdir_is_removed_after_success() {
        let fx = fixture(FakeToolkit::new(1, 60.0), FakeTranscriber::new()).await;

        fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap();

        let workdir = fx.toolkit.recorded_workdir().unwrap();
        assert!(!workdir.exists());
    }

    #[tokio::test]
    async fn workdir_is_removed_after_failure() {
        let fx = fixture(FakeToolkit::failing_probe(), FakeTranscriber::new()).await;

        // The probe runs after the fetch, so the workdir was created and used.
        fx.pipeline.run(fx.lesson_id, "asset-1").await.unwrap_err();

        let workdir = fx.toolkit.recorded_workdir().unwrap();
        assert!(!workdir.exists());
    }

    #[tokio::test]
    async fn unknown_lesson_fails_before_any_external_call() {
        let fx = fixture(FakeToolkit::new(1, 60.0), FakeTranscriber::new()).await;

        let err = fx
            .pipeline
            .run(Uuid::new_v4(), "asset-1")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::LessonNotFound(_)));
        assert_eq!(fx.transcriber.calls(), 0);
    }
}
