//! In-memory job log.
//!
//! Shares state between the log and its consumers, so a consumer created
//! before an append still sees the new job on its next poll. Used by tests
//! and by deployments that accept losing queued jobs on restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::{JobBatch, JobConsumer, JobLog, Offset, SeekPosition};

struct Shared<T> {
    jobs: RwLock<Vec<T>>,
    committed: RwLock<HashMap<String, Offset>>,
    next_offset: AtomicU64,
}

/// In-memory implementation of [`JobLog`].
pub struct MemoryJobLog<T> {
    shared: Arc<Shared<T>>,
}

impl<T> MemoryJobLog<T> {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs: RwLock::new(Vec::new()),
                committed: RwLock::new(HashMap::new()),
                next_offset: AtomicU64::new(0),
            }),
        }
    }

    /// Number of jobs in the log.
    pub async fn len(&self) -> usize {
        self.shared.jobs.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.shared.jobs.read().await.is_empty()
    }
}

impl<T> Default for MemoryJobLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> JobLog<T> for MemoryJobLog<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn append(&self, job: T) -> Result<Offset> {
        let mut jobs = self.shared.jobs.write().await;
        let offset = self.shared.next_offset.fetch_add(1, Ordering::SeqCst);
        jobs.push(job);
        Ok(offset)
    }

    async fn consumer(&self, group: &str) -> Result<Box<dyn JobConsumer<T>>> {
        let committed = self.shared.committed.read().await;
        let (position, committed_offset) = match committed.get(group) {
            Some(&offset) => (offset + 1, offset),
            None => (0, 0),
        };

        Ok(Box::new(MemoryConsumer {
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

struct MemoryConsumer<T> {
    group: String,
    shared: Arc<Shared<T>>,
    position: Offset,
    committed_offset: Offset,
}

impl<T: Clone> MemoryConsumer<T> {
    async fn read_from_position(&mut self, max_count: usize) -> JobBatch<T> {
        let jobs = self.shared.jobs.read().await;
        let start = self.position as usize;
        if start >= jobs.len() {
            return JobBatch::empty();
        }
        let end = std::cmp::min(start + max_count, jobs.len());
        let batch: Vec<(Offset, T)> = jobs[start..end]
            .iter()
            .enumerate()
            .map(|(i, job)| ((start + i) as Offset, job.clone()))
            .collect();
        if let Some((last, _)) = batch.last() {
            self.position = last + 1;
        }
        JobBatch::new(batch)
    }
}

#[async_trait]
impl<T> JobConsumer<T> for MemoryConsumer<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn poll(&mut self, max_count: usize, timeout: Duration) -> Result<JobBatch<T>> {
        let batch = self.read_from_position(max_count).await;
        if !batch.is_empty() {
            return Ok(batch);
        }
        // Nothing buffered; wait out the timeout once and retry.
        tokio::time::sleep(timeout).await;
        Ok(self.read_from_position(max_count).await)
    }

    async fn commit(&mut self, offset: Offset) -> Result<()> {
        self.committed_offset = offset;
        self.shared
            .committed
            .write()
            .await
            .insert(self.group.clone(), offset);
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

    #[tokio::test]
    async fn append_returns_incrementing_offsets() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();

        assert_eq!(log.append("first".to_string()).await.unwrap(), 0);
        assert_eq!(log.append("second".to_string()).await.unwrap(), 1);
        assert_eq!(log.append("third".to_string()).await.unwrap(), 2);
        assert_eq!(log.high_water_mark(), 3);
    }

    #[tokio::test]
    async fn consumer_polls_appended_jobs() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();
        log.append("first".to_string()).await.unwrap();
        log.append("second".to_string()).await.unwrap();

        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.first_offset(), Some(0));
        assert_eq!(batch.last_offset(), Some(1));
    }

    #[tokio::test]
    async fn consumer_sees_jobs_appended_after_creation() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();
        let mut consumer = log.consumer("worker").await.unwrap();

        log.append("late".to_string()).await.unwrap();

        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test]
    async fn consumer_respects_max_count() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();
        for i in 0..10 {
            log.append(format!("job-{i}")).await.unwrap();
        }

        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(3, Duration::from_millis(10)).await.unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(batch.last_offset(), Some(2));
    }

    #[tokio::test]
    async fn fresh_consumer_resumes_after_committed_offset() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();
        for i in 0..5 {
            log.append(format!("job-{i}")).await.unwrap();
        }

        let mut consumer = log.consumer("worker").await.unwrap();
        let batch = consumer.poll(3, Duration::from_millis(10)).await.unwrap();
        consumer.commit(batch.last_offset().unwrap()).await.unwrap();
        drop(consumer);

        let mut resumed = log.consumer("worker").await.unwrap();
        let batch = resumed.poll(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.first_offset(), Some(3));
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn independent_consumer_groups() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();
        for i in 0..4 {
            log.append(format!("job-{i}")).await.unwrap();
        }

        let mut worker = log.consumer("worker").await.unwrap();
        let batch = worker.poll(4, Duration::from_millis(10)).await.unwrap();
        worker.commit(batch.last_offset().unwrap()).await.unwrap();

        let mut audit = log.consumer("audit").await.unwrap();
        let batch = audit.poll(4, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.first_offset(), Some(0));
    }

    #[tokio::test]
    async fn seek_to_end_skips_existing_jobs() {
        let log: MemoryJobLog<String> = MemoryJobLog::new();
        log.append("old".to_string()).await.unwrap();

        let mut consumer = log.consumer("worker").await.unwrap();
        consumer.seek(SeekPosition::End).await.unwrap();

        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        assert!(batch.is_empty());

        log.append("new".to_string()).await.unwrap();
        let batch = consumer.poll(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.len(), 1);
    }
}
