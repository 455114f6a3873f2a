//! aula-providers - clients for the hosted services the pipeline depends on
//!
//! Every vendor dependency sits behind a trait so the pipeline and handlers
//! receive explicitly constructed, injected handles; nothing in this workspace
//! builds a client at module scope. The process entry point owns client
//! lifecycles. The `fake` module provides in-process stand-ins for development
//! and tests.

mod complete;
mod embed;
mod error;
pub mod fake;
mod search;
mod transcribe;
mod video;

pub use complete::{Completer, OpenAiCompleter};
pub use embed::{Embedder, OpenAiEmbedder};
pub use error::{ProviderError, Result};
pub use search::{SearchSnippet, SerperSearcher, WebSearcher};
pub use transcribe::{Transcriber, WhisperApiTranscriber};
pub use video::{DirectUpload, MuxVideoHost, VideoHost};
