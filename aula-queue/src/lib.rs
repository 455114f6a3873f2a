//! aula-queue - durable work queue between the webhook receiver and the worker
//!
//! The webhook receiver never awaits processing; it appends a job to a log and
//! returns to the sender. A separate worker task consumes the log through a
//! named consumer group, so failures are retryable and observable instead of
//! silently dropped. Consumer groups track a committed offset: a restarted
//! worker resumes from its last commit and re-receives the uncommitted tail
//! (at-least-once delivery, matching the pipeline's semantics).

mod error;
mod job;
mod jsonl;
mod memory;
mod traits;

pub use error::{Error, Result};
pub use job::ProcessLessonJob;
pub use jsonl::JsonlJobLog;
pub use memory::MemoryJobLog;
pub use traits::{JobBatch, JobConsumer, JobLog, Offset, SeekPosition};
