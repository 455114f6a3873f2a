//! Viewing progress and route assignment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aula_core::ViewingProgress;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveProgressRequest {
    #[serde(rename = "estudianteId")]
    pub estudiante_id: String,
    #[serde(rename = "claseId")]
    pub clase_id: Uuid,
    /// Playback position; `0` marks the lesson as completed.
    pub segundos: f64,
    /// When present, also moves the student's resume pointer in this route.
    #[serde(rename = "rutaId", default)]
    pub ruta_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveProgressResponse {
    pub saved: bool,
    pub completada: bool,
}

/// POST /api/progress
pub async fn save_progress(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveProgressRequest>,
) -> Result<Json<SaveProgressResponse>, ApiError> {
    if req.estudiante_id.trim().is_empty() {
        return Err(ApiError::BadRequest("estudianteId must not be empty".into()));
    }
    if req.segundos < 0.0 || !req.segundos.is_finite() {
        return Err(ApiError::BadRequest("segundos must be a non-negative number".into()));
    }
    if state.store.lesson(req.clase_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let progress = ViewingProgress::new(req.estudiante_id.trim(), req.clase_id, req.segundos);
    let completada = progress.is_completed();
    state.store.upsert_progress(progress).await?;

    if let Some(ruta_id) = req.ruta_id.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        state
            .store
            .set_last_viewed(req.estudiante_id.trim(), ruta_id, req.clase_id)
            .await?;
    }

    Ok(Json(SaveProgressResponse {
        saved: true,
        completada,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    #[serde(rename = "estudianteId")]
    pub estudiante_id: String,
    #[serde(rename = "claseId")]
    pub clase_id: Uuid,
    pub segundos: f64,
    pub completada: bool,
}

/// GET /api/progress/:student_id/:clase_id
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path((student_id, clase_id)): Path<(String, Uuid)>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let progress = state
        .store
        .progress(&student_id, clase_id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(ProgressResponse {
        estudiante_id: progress.student_id.clone(),
        clase_id: progress.lesson_id,
        segundos: progress.position_seconds,
        completada: progress.is_completed(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignRequest {
    #[serde(rename = "estudianteId")]
    pub estudiante_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignResponse {
    pub assigned: bool,
}

/// POST /api/rutas/:ruta_id/assign
pub async fn assign_route(
    State(state): State<Arc<AppState>>,
    Path(ruta_id): Path<String>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, ApiError> {
    if req.estudiante_id.trim().is_empty() {
        return Err(ApiError::BadRequest("estudianteId must not be empty".into()));
    }

    state
        .store
        .assign_route(req.estudiante_id.trim(), &ruta_id)
        .await?;
    tracing::info!(ruta_id = %ruta_id, "Assigned student to route");
    Ok(Json(AssignResponse { assigned: true }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResumeResponse {
    #[serde(rename = "rutaId")]
    pub ruta_id: String,
    /// Last lesson the student viewed in this route, if any.
    #[serde(rename = "claseId")]
    pub clase_id: Option<Uuid>,
}

/// GET /api/rutas/:ruta_id/resume/:student_id
///
/// 404s when the student is not assigned to the route; an assignment with no
/// viewing history yet returns a null lesson id instead.
pub async fn resume(
    State(state): State<Arc<AppState>>,
    Path((ruta_id, student_id)): Path<(String, String)>,
) -> Result<Json<ResumeResponse>, ApiError> {
    let assigned = state
        .store
        .assignments_for(&student_id)
        .await?
        .into_iter()
        .any(|a| a.ruta_id == ruta_id);
    if !assigned {
        return Err(ApiError::NotFound);
    }

    let clase_id = state.store.last_viewed(&student_id, &ruta_id).await?;
    Ok(Json(ResumeResponse { ruta_id, clase_id }))
}
