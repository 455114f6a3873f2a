//! aula-worker - turns uploaded lessons into searchable transcript passages
//!
//! The pipeline runs once per lesson: fetch the source media, probe its
//! duration, cut the audio into chunks, transcribe the chunks strictly in
//! order, split the concatenated transcript into passages, embed them, and
//! persist one passage row per fragment. The consumer module drives the
//! pipeline from the job log.

mod consumer;
mod error;
mod pipeline;

pub use consumer::{WORKER_GROUP, WorkerConfig, spawn_worker};
pub use error::{Result, WorkerError};
pub use pipeline::{ProcessingConfig, ProcessingPipeline, ProcessingSummary};
