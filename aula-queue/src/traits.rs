//! Core traits for job log operations.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Offset into a job log.
pub type Offset = u64;

/// Position to start reading from when seeking a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekPosition {
    /// Start from the beginning of the log.
    Beginning,
    /// Start from the end (new jobs only).
    End,
    /// Start from a specific offset.
    Offset(Offset),
}

/// A batch of jobs returned from polling, paired with their offsets.
#[derive(Debug)]
pub struct JobBatch<T> {
    jobs: Vec<(Offset, T)>,
}

impl<T> JobBatch<T> {
    /// Wrap a list of (offset, job) pairs.
    #[must_use]
    pub fn new(jobs: Vec<(Offset, T)>) -> Self {
        Self { jobs }
    }

    /// An empty batch.
    #[must_use]
    pub fn empty() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Offset of the first job in the batch.
    pub fn first_offset(&self) -> Option<Offset> {
        self.jobs.first().map(|(o, _)| *o)
    }

    /// Offset of the last job in the batch; this is what gets committed.
    pub fn last_offset(&self) -> Option<Offset> {
        self.jobs.last().map(|(o, _)| *o)
    }
}

impl<T> IntoIterator for JobBatch<T> {
    type Item = (Offset, T);
    type IntoIter = std::vec::IntoIter<(Offset, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.into_iter()
    }
}

/// Trait for appending jobs and creating consumers.
#[async_trait]
pub trait JobLog<T>: Send + Sync {
    /// Append a job to the log, returning its offset.
    async fn append(&self, job: T) -> Result<Offset>;

    /// Create a consumer for the given group.
    ///
    /// A fresh consumer resumes just after the group's last committed
    /// offset, or from the beginning for a group that never committed.
    async fn consumer(&self, group: &str) -> Result<Box<dyn JobConsumer<T>>>;

    /// Offset that the next appended job will receive.
    fn high_water_mark(&self) -> Offset;
}

/// Trait for polling jobs with offset tracking.
#[async_trait]
pub trait JobConsumer<T>: Send + Sync {
    /// Poll for up to `max_count` jobs, waiting at most `timeout` when the
    /// log has nothing new.
    async fn poll(&mut self, max_count: usize, timeout: Duration) -> Result<JobBatch<T>>;

    /// Commit the given offset for this consumer's group.
    async fn commit(&mut self, offset: Offset) -> Result<()>;

    /// Move the read position.
    async fn seek(&mut self, position: SeekPosition) -> Result<()>;

    /// Last committed offset for this consumer's group.
    fn committed_offset(&self) -> Offset;

    /// Name of this consumer's group.
    fn group(&self) -> &str;
}
