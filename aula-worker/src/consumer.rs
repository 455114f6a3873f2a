//! Queue consumer that drives the processing pipeline.
//!
//! One worker task polls the job log under a named consumer group, runs the
//! pipeline for each job, and commits after each batch. A failed job is
//! logged with its lesson id and left for manual re-triggering; it does not
//! stop the consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use aula_queue::{JobLog, ProcessLessonJob};

use crate::pipeline::ProcessingPipeline;

/// Consumer group name for the processing worker.
pub const WORKER_GROUP: &str = "processing-worker";

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs per poll.
    pub batch_size: usize,
    /// How long a poll waits when the log is empty.
    pub poll_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            poll_timeout: Duration::from_millis(500),
        }
    }
}

/// Spawn the worker task.
///
/// Runs until `shutdown` is cancelled. Poll errors back off for a second and
/// the loop continues; job errors are logged and skipped.
pub fn spawn_worker(
    log: Arc<dyn JobLog<ProcessLessonJob>>,
    pipeline: Arc<ProcessingPipeline>,
    config: WorkerConfig,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut consumer = match log.consumer(WORKER_GROUP).await {
            Ok(consumer) => consumer,
            Err(e) => {
                error!(error = %e, "Failed to create worker consumer");
                return;
            }
        };

        info!(group = WORKER_GROUP, "Processing worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(group = WORKER_GROUP, "Worker received shutdown signal");
                    break;
                }
                result = consumer.poll(config.batch_size, config.poll_timeout) => {
                    match result {
                        Ok(batch) => {
                            if batch.is_empty() {
                                continue;
                            }
                            debug!(count = batch.len(), "Processing job batch");

                            let last_offset = batch.last_offset();
                            for (offset, job) in batch {
                                match pipeline.run(job.lesson_id, &job.asset_id).await {
                                    Ok(summary) => {
                                        info!(
                                            offset,
                                            job_id = %job.job_id,
                                            lesson_id = %job.lesson_id,
                                            passages = summary.passages,
                                            "Job completed"
                                        );
                                    }
                                    Err(e) => {
                                        // Manual re-trigger path: POST the
                                        // processing endpoint with this
                                        // lesson and asset id.
                                        error!(
                                            offset,
                                            job_id = %job.job_id,
                                            lesson_id = %job.lesson_id,
                                            asset_id = %job.asset_id,
                                            error = %e,
                                            "Processing job failed"
                                        );
                                    }
                                }
                            }

                            if let Some(offset) = last_offset
                                && let Err(e) = consumer.commit(offset).await
                            {
                                error!(offset, error = %e, "Failed to commit offset");
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "Worker poll failed");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }

        info!(group = WORKER_GROUP, "Processing worker stopped");
    })
}
