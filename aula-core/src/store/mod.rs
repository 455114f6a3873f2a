//! Keyed store abstraction.
//!
//! Every persisted entity is reached through these traits. Each write is a
//! single-row upsert/insert scoped by its natural key (lesson id, or
//! student+lesson, or student+route); no cross-row transactions are assumed.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{Lesson, Passage, PassageMatch, RouteAssignment, ViewingProgress};

/// Lesson rows, keyed by lesson id.
#[async_trait]
pub trait LessonStore: Send + Sync {
    /// Insert a freshly created lesson.
    async fn insert_lesson(&self, lesson: Lesson) -> Result<()>;

    /// Fetch a lesson by id.
    async fn lesson(&self, id: Uuid) -> Result<Option<Lesson>>;

    /// Record the transcoded asset and playback ids (webhook write).
    async fn set_lesson_asset(&self, id: Uuid, asset_id: &str, playback_id: &str) -> Result<()>;

    /// Record the probed media duration (processing job write).
    async fn set_lesson_duration(&self, id: Uuid, seconds: f64) -> Result<()>;

    /// Delete a lesson, cascading to its passages.
    async fn delete_lesson(&self, id: Uuid) -> Result<()>;

    /// Total number of lessons (health reporting).
    async fn lesson_count(&self) -> Result<usize>;
}

/// Transcript passages and their embedding vectors, keyed by lesson id.
#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Append a passage row.
    async fn insert_passage(&self, passage: Passage) -> Result<()>;

    /// Remove all passages for a lesson, returning how many were removed.
    async fn delete_passages(&self, lesson_id: Uuid) -> Result<usize>;

    /// All passages for a lesson in transcript order.
    async fn passages(&self, lesson_id: Uuid) -> Result<Vec<Passage>>;

    /// Nearest passages for a lesson above a similarity threshold.
    ///
    /// Similarity search is the store's responsibility; callers never rank
    /// vectors themselves. Results are sorted by descending score.
    async fn match_passages(
        &self,
        lesson_id: Uuid,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<PassageMatch>>;
}

/// Viewing progress, keyed by (student, lesson).
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Upsert the last-viewed position for a (student, lesson) pair.
    async fn upsert_progress(&self, progress: ViewingProgress) -> Result<()>;

    /// Fetch progress for a (student, lesson) pair.
    async fn progress(&self, student_id: &str, lesson_id: Uuid)
    -> Result<Option<ViewingProgress>>;
}

/// Route membership and resume pointers, keyed by (student, route).
#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Assign a student to a route (upsert; re-assignment keeps the pointer).
    async fn assign_route(&self, student_id: &str, ruta_id: &str) -> Result<()>;

    /// Move the resume pointer for a (student, route) pair.
    async fn set_last_viewed(&self, student_id: &str, ruta_id: &str, lesson_id: Uuid)
    -> Result<()>;

    /// The resume pointer for a (student, route) pair, if assigned.
    async fn last_viewed(&self, student_id: &str, ruta_id: &str) -> Result<Option<Uuid>>;

    /// All route assignments for a student.
    async fn assignments_for(&self, student_id: &str) -> Result<Vec<RouteAssignment>>;
}

/// Convenience bound for handles that reach every entity.
pub trait Store: LessonStore + PassageStore + ProgressStore + RouteStore {}

impl<T> Store for T where T: LessonStore + PassageStore + ProgressStore + RouteStore {}
