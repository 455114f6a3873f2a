//! In-memory store implementation.
//!
//! Backs the daemon in single-process deployments and every test. All maps
//! are keyed by the entities' natural keys, so each write stays a single-row
//! upsert. Similarity search is a cosine scan over the lesson's passages.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::model::{Lesson, Passage, PassageMatch, RouteAssignment, ViewingProgress};
use crate::store::{LessonStore, PassageStore, ProgressStore, RouteStore};

/// In-memory implementation of all store traits.
#[derive(Default)]
pub struct MemoryStore {
    lessons: RwLock<HashMap<Uuid, Lesson>>,
    passages: RwLock<HashMap<Uuid, Vec<Passage>>>,
    progress: RwLock<HashMap<(String, Uuid), ViewingProgress>>,
    routes: RwLock<HashMap<(String, String), RouteAssignment>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity between two vectors; 0.0 when either has zero norm.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl LessonStore for MemoryStore {
    async fn insert_lesson(&self, lesson: Lesson) -> Result<()> {
        self.lessons.write().await.insert(lesson.id, lesson);
        Ok(())
    }

    async fn lesson(&self, id: Uuid) -> Result<Option<Lesson>> {
        Ok(self.lessons.read().await.get(&id).cloned())
    }

    async fn set_lesson_asset(&self, id: Uuid, asset_id: &str, playback_id: &str) -> Result<()> {
        let mut lessons = self.lessons.write().await;
        let lesson = lessons.get_mut(&id).ok_or(StoreError::LessonNotFound(id))?;
        lesson.asset_id = Some(asset_id.to_string());
        lesson.playback_id = Some(playback_id.to_string());
        Ok(())
    }

    async fn set_lesson_duration(&self, id: Uuid, seconds: f64) -> Result<()> {
        let mut lessons = self.lessons.write().await;
        let lesson = lessons.get_mut(&id).ok_or(StoreError::LessonNotFound(id))?;
        lesson.duration_seconds = Some(seconds);
        Ok(())
    }

    async fn delete_lesson(&self, id: Uuid) -> Result<()> {
        self.lessons
            .write()
            .await
            .remove(&id)
            .ok_or(StoreError::LessonNotFound(id))?;
        // Cascade to passages
        self.passages.write().await.remove(&id);
        Ok(())
    }

    async fn lesson_count(&self) -> Result<usize> {
        Ok(self.lessons.read().await.len())
    }
}

#[async_trait]
impl PassageStore for MemoryStore {
    async fn insert_passage(&self, passage: Passage) -> Result<()> {
        self.passages
            .write()
            .await
            .entry(passage.lesson_id)
            .or_default()
            .push(passage);
        Ok(())
    }

    async fn delete_passages(&self, lesson_id: Uuid) -> Result<usize> {
        Ok(self
            .passages
            .write()
            .await
            .remove(&lesson_id)
            .map(|rows| rows.len())
            .unwrap_or(0))
    }

    async fn passages(&self, lesson_id: Uuid) -> Result<Vec<Passage>> {
        let mut rows = self
            .passages
            .read()
            .await
            .get(&lesson_id)
            .cloned()
            .unwrap_or_default();
        rows.sort_by_key(|p| p.seq);
        Ok(rows)
    }

    async fn match_passages(
        &self,
        lesson_id: Uuid,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<PassageMatch>> {
        let passages = self.passages.read().await;
        let mut matches: Vec<PassageMatch> = passages
            .get(&lesson_id)
            .map(|rows| {
                rows.iter()
                    .map(|p| PassageMatch {
                        score: cosine_similarity(&p.embedding, query),
                        passage: p.clone(),
                    })
                    .filter(|m| m.score >= threshold)
                    .collect()
            })
            .unwrap_or_default();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(limit);
        Ok(matches)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn upsert_progress(&self, progress: ViewingProgress) -> Result<()> {
        let key = (progress.student_id.clone(), progress.lesson_id);
        self.progress.write().await.insert(key, progress);
        Ok(())
    }

    async fn progress(
        &self,
        student_id: &str,
        lesson_id: Uuid,
    ) -> Result<Option<ViewingProgress>> {
        Ok(self
            .progress
            .read()
            .await
            .get(&(student_id.to_string(), lesson_id))
            .cloned())
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn assign_route(&self, student_id: &str, ruta_id: &str) -> Result<()> {
        let key = (student_id.to_string(), ruta_id.to_string());
        self.routes
            .write()
            .await
            .entry(key)
            .or_insert_with(|| RouteAssignment::new(student_id, ruta_id));
        Ok(())
    }

    async fn set_last_viewed(
        &self,
        student_id: &str,
        ruta_id: &str,
        lesson_id: Uuid,
    ) -> Result<()> {
        let key = (student_id.to_string(), ruta_id.to_string());
        let mut routes = self.routes.write().await;
        let assignment = routes
            .get_mut(&key)
            .ok_or_else(|| StoreError::AssignmentNotFound {
                student_id: student_id.to_string(),
                ruta_id: ruta_id.to_string(),
            })?;
        assignment.last_lesson_id = Some(lesson_id);
        Ok(())
    }

    async fn last_viewed(&self, student_id: &str, ruta_id: &str) -> Result<Option<Uuid>> {
        Ok(self
            .routes
            .read()
            .await
            .get(&(student_id.to_string(), ruta_id.to_string()))
            .and_then(|a| a.last_lesson_id))
    }

    async fn assignments_for(&self, student_id: &str) -> Result<Vec<RouteAssignment>> {
        Ok(self
            .routes
            .read()
            .await
            .values()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, 0.5, 0.1];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_zero_norm() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_handles_length_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn set_asset_requires_existing_lesson() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4();
        let err = store
            .set_lesson_asset(missing, "asset-1", "playback-1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LessonNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn delete_lesson_cascades_to_passages() {
        let store = MemoryStore::new();
        let lesson = Lesson::new("Clase 1", "", "ruta-1");
        let lesson_id = lesson.id;
        store.insert_lesson(lesson).await.unwrap();
        store
            .insert_passage(Passage::new(lesson_id, 0, "Hola.", vec![1.0, 0.0]))
            .await
            .unwrap();

        store.delete_lesson(lesson_id).await.unwrap();
        assert!(store.passages(lesson_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn match_passages_filters_and_ranks() {
        let store = MemoryStore::new();
        let lesson_id = Uuid::new_v4();
        store
            .insert_passage(Passage::new(lesson_id, 0, "close", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert_passage(Passage::new(lesson_id, 1, "closer", vec![0.9, 0.1]))
            .await
            .unwrap();
        store
            .insert_passage(Passage::new(lesson_id, 2, "far", vec![0.0, 1.0]))
            .await
            .unwrap();

        let matches = store
            .match_passages(lesson_id, &[1.0, 0.0], 0.5, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].passage.text, "close");
        assert!(matches[0].score >= matches[1].score);
    }

    #[tokio::test]
    async fn match_passages_scoped_to_lesson() {
        let store = MemoryStore::new();
        let lesson_a = Uuid::new_v4();
        let lesson_b = Uuid::new_v4();
        store
            .insert_passage(Passage::new(lesson_a, 0, "mine", vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .insert_passage(Passage::new(lesson_b, 0, "other", vec![1.0, 0.0]))
            .await
            .unwrap();

        let matches = store
            .match_passages(lesson_a, &[1.0, 0.0], 0.5, 10)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].passage.text, "mine");
    }

    #[tokio::test]
    async fn progress_upsert_replaces_by_natural_key() {
        let store = MemoryStore::new();
        let lesson_id = Uuid::new_v4();
        store
            .upsert_progress(ViewingProgress::new("student-1", lesson_id, 120.0))
            .await
            .unwrap();
        store
            .upsert_progress(ViewingProgress::new("student-1", lesson_id, 0.0))
            .await
            .unwrap();

        let progress = store
            .progress("student-1", lesson_id)
            .await
            .unwrap()
            .unwrap();
        assert!(progress.is_completed());
    }

    #[tokio::test]
    async fn reassigning_route_keeps_resume_pointer() {
        let store = MemoryStore::new();
        let lesson_id = Uuid::new_v4();
        store.assign_route("student-1", "ruta-1").await.unwrap();
        store
            .set_last_viewed("student-1", "ruta-1", lesson_id)
            .await
            .unwrap();

        store.assign_route("student-1", "ruta-1").await.unwrap();
        let resume = store.last_viewed("student-1", "ruta-1").await.unwrap();
        assert_eq!(resume, Some(lesson_id));
    }

    #[tokio::test]
    async fn set_last_viewed_requires_assignment() {
        let store = MemoryStore::new();
        let err = store
            .set_last_viewed("student-1", "ruta-1", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AssignmentNotFound { .. }));
    }
}
