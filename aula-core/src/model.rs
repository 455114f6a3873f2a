//! Persisted entities of the aula platform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single video lesson (clase) within a route.
///
/// Created empty by a teacher action. The webhook receiver fills in
/// `asset_id`/`playback_id` once the video host has transcoded the upload, and
/// the processing job fills in `duration_seconds`. After that the row is only
/// ever touched by deletion, which cascades to its passages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: Uuid,
    pub titulo: String,
    pub descripcion: String,
    /// Route (ruta) this lesson belongs to.
    pub ruta_id: String,
    /// Probed media duration, set by the processing job.
    pub duration_seconds: Option<f64>,
    /// Video host asset identifier, set once by the webhook.
    pub asset_id: Option<String>,
    /// Video host playback identifier, set once by the webhook.
    pub playback_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lesson {
    /// Create a new lesson with a fresh id and no media attached yet.
    pub fn new(
        titulo: impl Into<String>,
        descripcion: impl Into<String>,
        ruta_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            titulo: titulo.into(),
            descripcion: descripcion.into(),
            ruta_id: ruta_id.into(),
            duration_seconds: None,
            asset_id: None,
            playback_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A transcript fragment with its embedding vector.
///
/// Written only by the processing job, append-only within a run, removed by
/// cascading lesson deletion or by the idempotent re-processing sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub id: Uuid,
    pub lesson_id: Uuid,
    /// Position of this passage within the lesson transcript.
    pub seq: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

impl Passage {
    pub fn new(lesson_id: Uuid, seq: usize, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lesson_id,
            seq,
            text: text.into(),
            embedding,
        }
    }
}

/// A passage returned from similarity search together with its score.
#[derive(Debug, Clone)]
pub struct PassageMatch {
    pub passage: Passage,
    /// Cosine similarity against the query vector, in `[-1, 1]`.
    pub score: f32,
}

/// Last viewed position for a (student, lesson) pair.
///
/// `position_seconds == 0.0` is the sentinel for "completed".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewingProgress {
    pub student_id: String,
    pub lesson_id: Uuid,
    pub position_seconds: f64,
    pub updated_at: DateTime<Utc>,
}

impl ViewingProgress {
    pub fn new(student_id: impl Into<String>, lesson_id: Uuid, position_seconds: f64) -> Self {
        Self {
            student_id: student_id.into(),
            lesson_id,
            position_seconds,
            updated_at: Utc::now(),
        }
    }

    /// Whether the sentinel position marks this lesson as completed.
    pub fn is_completed(&self) -> bool {
        self.position_seconds == 0.0
    }
}

/// Membership of a student in a route, with the resume pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub student_id: String,
    pub ruta_id: String,
    /// Last lesson the student viewed within this route.
    pub last_lesson_id: Option<Uuid>,
    pub assigned_at: DateTime<Utc>,
}

impl RouteAssignment {
    pub fn new(student_id: impl Into<String>, ruta_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            ruta_id: ruta_id.into(),
            last_lesson_id: None,
            assigned_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_lesson_has_no_media() {
        let lesson = Lesson::new("Presente simple", "Introducción", "ruta-1");
        assert!(lesson.asset_id.is_none());
        assert!(lesson.playback_id.is_none());
        assert!(lesson.duration_seconds.is_none());
    }

    #[test]
    fn zero_position_marks_completed() {
        let lesson_id = Uuid::new_v4();
        let progress = ViewingProgress::new("student-1", lesson_id, 0.0);
        assert!(progress.is_completed());

        let progress = ViewingProgress::new("student-1", lesson_id, 42.5);
        assert!(!progress.is_completed());
    }

    #[test]
    fn new_assignment_has_no_resume_pointer() {
        let assignment = RouteAssignment::new("student-1", "ruta-1");
        assert!(assignment.last_lesson_id.is_none());
    }
}
