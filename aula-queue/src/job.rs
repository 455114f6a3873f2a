//! Job types carried by the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to run the transcription/embedding pipeline for one lesson.
///
/// Appended by the webhook receiver once the video host reports the asset
/// ready; consumed by the processing worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessLessonJob {
    pub job_id: Uuid,
    pub lesson_id: Uuid,
    /// Video host asset identifier to fetch the source media from.
    pub asset_id: String,
    pub enqueued_at: DateTime<Utc>,
}

impl ProcessLessonJob {
    pub fn new(lesson_id: Uuid, asset_id: impl Into<String>) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            lesson_id,
            asset_id: asset_id.into(),
            enqueued_at: Utc::now(),
        }
    }
}
