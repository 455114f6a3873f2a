//! File-backed job log.
//!
//! Jobs are appended as one JSON object per line to `jobs.jsonl`; consumer
//! group commits go to `offsets.json` beside it. Both are re-read on open, so
//! queued jobs and commit positions survive a daemon restart. The whole log is
//! also mirrored in memory: it only ever holds pending processing jobs, not an
//! unbounded event history.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::Result;
use crate::traits::{JobBatch, JobConsumer, JobLog, Offset, SeekPosition};

const JOBS_FILE: &str = "jobs.jsonl";
const OFFSETS_FILE: &str = "offsets.json";

struct Shared<T> {
    /// One slot per line in `jobs.jsonl`; `None` marks a line that failed to
    /// decode, keeping offsets aligned with what consumers committed.
    jobs: RwLock<Vec<Option<T>>>,
    committed: RwLock<HashMap<String, Offset>>,
    next_offset: AtomicU64,
    jobs_path: PathBuf,
    offsets_path: PathBuf,
}

/// JSONL-file-backed implementation of [`JobLog`].
pub struct JsonlJobLog<T> {
    shared: Arc<Shared<T>>,
}

impl<T> JsonlJobLog<T>
where
    T: DeserializeOwned,
{
    /// Open (or create) a log rooted at `dir`.
    ///
    /// Lines that fail to decode are dropped with a warning rather than
    /// poisoning the whole log, but their offsets stay reserved so commit
    /// positions recorded before the corruption still name the same jobs.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let jobs_path = dir.join(JOBS_FILE);
        let offsets_path = dir.join(OFFSETS_FILE);

        let mut jobs = Vec::new();
        if jobs_path.exists() {
            let contents = tokio::fs::read_to_string(&jobs_path).await?;
            for (line_no, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<T>(line) {
                    Ok(job) => jobs.push(Some(job)),
                    Err(e) => {
                        warn!(line = line_no + 1, error = %e, "Dropping undecodable job log line");
                        jobs.push(None);
                    }
                }
            }
        }

        let committed: HashMap<String, Offset> = if offsets_path.exists() {
            let contents = tokio::fs::read_to_string(&offsets_path).await?;
            serde_json::from_str(&contents)?
        } else {
            HashMap::new()
        };

        let next_offset = AtomicU64::new(jobs.len() as u64);

        Ok(Self {
            shared: Arc::new(Shared {
                jobs: RwLock::new(jobs),
                committed: RwLock::new(committed),
                next_offset,
                jobs_path,
                offsets_path,
            }),
        })
    }
}

#[async_trait]
impl<T> JobLog<T> for JsonlJobLog<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn append(&self, job: T) -> Result<Offset> {
        let line = serde_json::to_string(&job)?;

        // Hold the write lock across the file append so offsets and line
        // numbers stay in step.
        let mut jobs = self.shared.jobs.write().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.shared.jobs_path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        let offset = self.shared.next_offset.fetch_add(1, Ordering::SeqCst);
        jobs.push(Some(job));
        Ok(offset)
    }

    async fn consumer(&self, group: &str) -> Result<Box<dyn JobConsumer<T>>> {
        let committed = self.shared.committed.read().await;
        let (position, committed_offset) = match committed.get(group) {
            Some(&offset) => (offset + 1, offset),
            None => (0, 0),
        };

        Ok(Box::new(JsonlConsumer {
            group: group.to_string(),
            shared: Arc::clone(&self.shared),
            position,
            committed_offset,
        }))
    }

    fn high_water_mark(&self) -> Offset {
        self.shared.next_offset.load(Ordering::SeqCst)
    }
}

struct JsonlConsumer<T> {
    group: String,
    shared: Arc<Shared<T>>,
    position: Offset,
    committed_offset: Offset,
}

impl<T: Clone> JsonlConsumer<T> {
    async fn read_from_position(&mut self, max_count: usize) -> JobBatch<T> {
        let jobs = self.shared.jobs.read().await;
        let mut batch = Vec::new();
        let mut pos = self.position as usize;
        // Empty slots stand in for lines the log could not decode; walk past
        // them without handing them out, but count them toward the position.
        while pos < jobs.len() && batch.len() < max_count {
            if let Some(job) = &jobs[pos] {
                batch.push((pos as Offset, job.clone()));
            }
            pos += 1;
        }
        self.position = pos as Offset;
        JobBatch::new(batch)
    }
}

#[async_trait]
impl<T> JobConsumer<T> for JsonlConsumer<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    async fn poll(&mut self, max_count: usize, timeout: Duration) -> Result<JobBatch<T>> {
        let batch = self.read_from_position(max_count).await;
        if !batch.is_empty() {
            return Ok(batch);
        }
        tokio::time::sleep(timeout).await;
        Ok(self.read_from_position(max_count).await)
    }

    async fn commit(&mut self, offset: Offset) -> Result<()> {
        self.committed_offset = offset;
        let mut committed = self.shared.committed.write().await;
        committed.insert(self.group.clone(), offset);
        let contents = serde_json::to_string_pretty(&*committed)?;
        tokio::fs::write(&self.shared.offsets_path, contents).await?;
        Ok(())
    }

    async fn seek(&mut self, position: SeekPosition) -> Result<()> {
        self.position = match position {
            SeekPosition::Beginning => 0,
            SeekPosition::End => self.shared.jobs.read().await.len() as Offset,
            SeekPosition::Offset(offset) => offset,
        };
        Ok(())
    }

    fn committed_offset(&self) -> Offset {
        self.committed_offset
    }

    fn group(&self) -> &str {
        &self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestJob {
        name: String,
    }

    fn job(name: &str) -> TestJob {
        TestJob {
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn jobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
            log.append(job("a")).await.unwrap();
            log.append(job("b")).await.unwrap();
        }

        let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
        assert_eq!(log.high_water_mark(), 2);

        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn committed_offsets_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
            for name in ["a", "b", "c"] {
                log.append(job(name)).await.unwrap();
            }
            let mut consumer = log.consumer("worker").await.unwrap();
            let batch = consumer.poll(2, Duration::from_millis(10)).await.unwrap();
            consumer.commit(batch.last_offset().unwrap()).await.unwrap();
        }

        let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.first_offset(), Some(2));
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn undecodable_lines_keep_their_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let jobs_path = dir.path().join(JOBS_FILE);
        tokio::fs::write(&jobs_path, "{\"name\":\"a\"}\nnot json\n{\"name\":\"c\"}\n")
            .await
            .unwrap();

        let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
        assert_eq!(log.high_water_mark(), 3);

        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        let jobs: Vec<(Offset, TestJob)> = batch.into_iter().collect();
        assert_eq!(jobs, vec![(0, job("a")), (2, job("c"))]);
    }

    #[tokio::test]
    async fn corrupt_line_does_not_shift_committed_offsets() {
        let dir = tempfile::tempdir().unwrap();

        {
            let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
            for name in ["a", "b", "c"] {
                log.append(job(name)).await.unwrap();
            }
            let mut consumer = log.consumer("worker").await.unwrap();
            let batch = consumer.poll(2, Duration::from_millis(10)).await.unwrap();
            consumer.commit(batch.last_offset().unwrap()).await.unwrap();
        }

        // Corrupt the middle line, which the group already consumed.
        let jobs_path = dir.path().join(JOBS_FILE);
        let contents = tokio::fs::read_to_string(&jobs_path).await.unwrap();
        let mangled: Vec<String> = contents
            .lines()
            .enumerate()
            .map(|(i, line)| if i == 1 { "garbage".to_string() } else { line.to_string() })
            .collect();
        tokio::fs::write(&jobs_path, mangled.join("\n") + "\n")
            .await
            .unwrap();

        let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
        assert_eq!(log.high_water_mark(), 3);

        // Resuming from the committed offset still delivers exactly "c".
        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        let jobs: Vec<(Offset, TestJob)> = batch.into_iter().collect();
        assert_eq!(jobs, vec![(2, job("c"))]);
    }

    #[tokio::test]
    async fn consumer_sees_jobs_appended_after_creation() {
        let dir = tempfile::tempdir().unwrap();
        let log: JsonlJobLog<TestJob> = JsonlJobLog::open(dir.path()).await.unwrap();
        let mut consumer = log.consumer("worker").await.unwrap();

        log.append(job("late")).await.unwrap();

        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.len(), 1);
    }
}
