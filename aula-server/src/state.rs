//! Shared application state for the aula server.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use aula_core::store::Store;
use aula_providers::{Completer, Embedder, VideoHost, WebSearcher};
use aula_queue::{JobLog, ProcessLessonJob};
use aula_worker::ProcessingPipeline;

/// Retrieval tunables for the chat handler.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Minimum cosine similarity for a passage to count as context.
    pub match_threshold: f32,
    /// How many passages to feed into the prompt.
    pub match_count: usize,
    /// How many web search hits to fold in as secondary context.
    pub web_results: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.78,
            match_count: 5,
            web_results: 3,
        }
    }
}

/// Shared state accessible by all handlers.
///
/// Every external dependency is an injected handle owned by the process entry
/// point; handlers never construct clients.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn JobLog<ProcessLessonJob>>,
    pub video: Arc<dyn VideoHost>,
    pub embedder: Arc<dyn Embedder>,
    pub completer: Arc<dyn Completer>,
    pub searcher: Arc<dyn WebSearcher>,
    pub pipeline: Arc<ProcessingPipeline>,
    pub chat: ChatConfig,
    /// Shared secret for the processing trigger endpoint.
    pub job_secret: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn JobLog<ProcessLessonJob>>,
        video: Arc<dyn VideoHost>,
        embedder: Arc<dyn Embedder>,
        completer: Arc<dyn Completer>,
        searcher: Arc<dyn WebSearcher>,
        pipeline: Arc<ProcessingPipeline>,
        chat: ChatConfig,
        job_secret: impl Into<String>,
    ) -> Self {
        Self {
            store,
            queue,
            video,
            embedder,
            completer,
            searcher,
            pipeline,
            chat,
            job_secret: job_secret.into(),
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running.
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
