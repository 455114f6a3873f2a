//! Serve command: runs the HTTP server and the processing worker together.
//!
//! All hosted-service credentials come from the environment:
//!   AULA_OPENAI_API_KEY    embeddings, completions, transcription
//!   AULA_MUX_TOKEN_ID      video host API token id
//!   AULA_MUX_TOKEN_SECRET  video host API token secret
//!   AULA_SEARCH_API_KEY    web search (optional; chat degrades without it)
//!   AULA_API_TOKEN         bearer token for /api routes (optional)
//!   AULA_JOB_SECRET        shared secret for the processing trigger
//!
//! `--offline` swaps every hosted service for an in-process fake, which is
//! how local development runs without any keys.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use aula_core::{MemoryStore, SentenceSplitter};
use aula_media::FfmpegToolkit;
use aula_providers::fake::{
    FakeCompleter, FakeEmbedder, FakeTranscriber, FakeVideoHost, FakeWebSearcher,
};
use aula_providers::{
    Completer, Embedder, MuxVideoHost, OpenAiCompleter, OpenAiEmbedder, SerperSearcher,
    Transcriber, VideoHost, WebSearcher, WhisperApiTranscriber,
};
use aula_queue::{JobLog, JsonlJobLog, MemoryJobLog, ProcessLessonJob};
use aula_server::{AppState, AulaServer, AuthLayer, ChatConfig, ServerConfig};
use aula_worker::{ProcessingConfig, ProcessingPipeline, WorkerConfig, spawn_worker};

use crate::config::ConfigLoader;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const EMBEDDING_MODEL: &str = "text-embedding-3-small";
const COMPLETION_MODEL: &str = "gpt-4o-mini";
const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Use in-process fakes instead of hosted services (no keys needed)
    #[arg(long)]
    pub offline: bool,

    /// Keep the job queue in memory instead of on disk
    #[arg(long)]
    pub ephemeral_queue: bool,
}

struct Providers {
    video: Arc<dyn VideoHost>,
    transcriber: Arc<dyn Transcriber>,
    embedder: Arc<dyn Embedder>,
    completer: Arc<dyn Completer>,
    searcher: Arc<dyn WebSearcher>,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_required(name: &str) -> Result<String> {
    env_opt(name).with_context(|| format!("environment variable {name} is not set"))
}

fn build_providers(offline: bool, client: &reqwest::Client) -> Result<Providers> {
    if offline {
        info!("Running offline with fake providers");
        return Ok(Providers {
            video: Arc::new(FakeVideoHost::new()),
            transcriber: Arc::new(FakeTranscriber::new()),
            embedder: Arc::new(FakeEmbedder::new()),
            completer: Arc::new(FakeCompleter::new(
                "Respuesta de desarrollo: el servidor corre en modo offline.",
            )),
            searcher: Arc::new(FakeWebSearcher::empty()),
        });
    }

    let openai_key = env_required("AULA_OPENAI_API_KEY")?;
    let mux_token_id = env_required("AULA_MUX_TOKEN_ID")?;
    let mux_token_secret = env_required("AULA_MUX_TOKEN_SECRET")?;

    let searcher: Arc<dyn WebSearcher> = match env_opt("AULA_SEARCH_API_KEY") {
        Some(key) => Arc::new(SerperSearcher::new(client.clone(), key)?),
        None => {
            info!("AULA_SEARCH_API_KEY not set; chat runs without web context");
            Arc::new(FakeWebSearcher::empty())
        }
    };

    Ok(Providers {
        video: Arc::new(MuxVideoHost::new(
            client.clone(),
            mux_token_id,
            mux_token_secret,
        )?),
        transcriber: Arc::new(WhisperApiTranscriber::new(
            client.clone(),
            OPENAI_BASE_URL,
            &openai_key,
            TRANSCRIPTION_MODEL,
        )?),
        embedder: Arc::new(OpenAiEmbedder::new(
            client.clone(),
            OPENAI_BASE_URL,
            &openai_key,
            EMBEDDING_MODEL,
        )?),
        completer: Arc::new(OpenAiCompleter::new(
            client.clone(),
            OPENAI_BASE_URL,
            &openai_key,
            COMPLETION_MODEL,
        )?),
        searcher,
    })
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);

    let client = reqwest::Client::new();
    let providers = build_providers(args.offline, &client)?;

    let job_secret = match env_opt("AULA_JOB_SECRET") {
        Some(secret) => secret,
        None if args.offline => "aula-dev-secret".to_string(),
        None => bail!("environment variable AULA_JOB_SECRET is not set"),
    };
    let auth_layer = match env_opt("AULA_API_TOKEN") {
        Some(token) => AuthLayer::new(token),
        None => {
            info!("AULA_API_TOKEN not set; API routes are unauthenticated");
            AuthLayer::disabled()
        }
    };

    let store = Arc::new(MemoryStore::new());
    let queue: Arc<dyn JobLog<ProcessLessonJob>> = if args.ephemeral_queue {
        Arc::new(MemoryJobLog::new())
    } else {
        let dir = config
            .processing
            .queue_dir
            .clone()
            .or_else(ConfigLoader::default_queue_dir)
            .context("could not determine a queue directory")?;
        info!(dir = %dir.display(), "Opening durable job queue");
        Arc::new(JsonlJobLog::open(&dir).await?)
    };

    let pipeline = Arc::new(ProcessingPipeline::new(
        store.clone(),
        Arc::clone(&providers.video),
        Arc::new(FfmpegToolkit::new(client.clone())),
        Arc::clone(&providers.transcriber),
        Arc::clone(&providers.embedder),
        Arc::new(SentenceSplitter),
        ProcessingConfig {
            chunk_seconds: config.processing.chunk_seconds,
            embed_concurrency: config.processing.embed_concurrency,
        },
    ));

    let state = Arc::new(AppState::new(
        store,
        Arc::clone(&queue),
        providers.video,
        providers.embedder,
        providers.completer,
        providers.searcher,
        Arc::clone(&pipeline),
        ChatConfig {
            match_threshold: config.chat.match_threshold,
            match_count: config.chat.match_count,
            web_results: config.chat.web_results,
        },
        job_secret,
    ));

    let shutdown = CancellationToken::new();
    let worker = spawn_worker(queue, pipeline, WorkerConfig::default(), shutdown.clone());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    info!("Starting aula server on {}:{}", host, port);
    let server = AulaServer::new(state, auth_layer, ServerConfig { host, port });
    let result = server.run(shutdown.clone()).await;

    shutdown.cancel();
    let _ = worker.await;

    result.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_args_defaults() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let cli = TestCli::parse_from(["test"]);
        assert!(cli.serve.port.is_none());
        assert!(cli.serve.host.is_none());
        assert!(!cli.serve.offline);
        assert!(!cli.serve.ephemeral_queue);
    }

    #[test]
    fn serve_args_offline_flag() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            serve: ServeArgs,
        }

        let cli = TestCli::parse_from(["test", "--offline", "--port", "9000"]);
        assert!(cli.serve.offline);
        assert_eq!(cli.serve.port, Some(9000));
    }

    #[test]
    fn offline_providers_need_no_keys() {
        let client = reqwest::Client::new();
        assert!(build_providers(true, &client).is_ok());
    }
}
