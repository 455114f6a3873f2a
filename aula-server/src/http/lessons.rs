//! Lesson lifecycle endpoints: creation, manual processing, deletion.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Request, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aula_core::Lesson;

use crate::error::ApiError;
use crate::middleware::bearer_token;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLessonRequest {
    pub titulo: String,
    #[serde(default)]
    pub descripcion: String,
    #[serde(rename = "rutaId")]
    pub ruta_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLessonResponse {
    #[serde(rename = "claseId")]
    pub clase_id: Uuid,
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
}

/// POST /api/clases
///
/// Creates the lesson row first, then asks the video host for a direct-upload
/// slot carrying the lesson id as passthrough. The webhook closes the loop
/// once transcoding finishes.
pub async fn create_lesson(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLessonRequest>,
) -> Result<Json<CreateLessonResponse>, ApiError> {
    if req.titulo.trim().is_empty() {
        return Err(ApiError::BadRequest("titulo must not be empty".into()));
    }
    if req.ruta_id.trim().is_empty() {
        return Err(ApiError::BadRequest("rutaId must not be empty".into()));
    }

    let lesson = Lesson::new(req.titulo.trim(), req.descripcion.trim(), req.ruta_id.trim());
    let lesson_id = lesson.id;
    state.store.insert_lesson(lesson).await?;

    let upload = state
        .video
        .create_direct_upload(&lesson_id.to_string())
        .await?;
    tracing::info!(lesson_id = %lesson_id, upload_id = %upload.upload_id, "Created lesson");

    Ok(Json(CreateLessonResponse {
        clase_id: lesson_id,
        upload_url: upload.upload_url,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "claseId")]
    pub clase_id: Uuid,
    /// Asset to process; defaults to the one recorded by the webhook.
    #[serde(rename = "muxAssetId", default)]
    pub mux_asset_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub pasajes: usize,
    pub segmentos: usize,
    #[serde(rename = "duracionSegundos")]
    pub duracion_segundos: u64,
}

/// POST /api/clases/process
///
/// Manual re-processing trigger, guarded by its own shared secret on top of
/// the API token. The secret is checked before any store or provider call.
/// Runs the pipeline inline and reports what it produced.
pub async fn process_lesson(State(state): State<Arc<AppState>>, request: Request) -> Result<Json<ProcessResponse>, ApiError> {
    match bearer_token(&request) {
        Some(token) if token == state.job_secret => {}
        _ => return Err(ApiError::Unauthorized),
    }

    let body = axum::body::to_bytes(request.into_body(), 1024 * 1024)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable body: {e}")))?;
    let req: ProcessRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))?;

    let lesson = state
        .store
        .lesson(req.clase_id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let asset_id = req
        .mux_asset_id
        .or(lesson.asset_id)
        .ok_or_else(|| ApiError::BadRequest("lesson has no transcoded asset yet".into()))?;

    let summary = state.pipeline.run(req.clase_id, &asset_id).await?;
    Ok(Json(ProcessResponse {
        pasajes: summary.passages,
        segmentos: summary.chunks,
        duracion_segundos: summary.duration_seconds,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteLessonResponse {
    pub deleted: bool,
}

/// DELETE /api/clases/:id
pub async fn delete_lesson(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteLessonResponse>, ApiError> {
    state.store.delete_lesson(id).await?;
    tracing::info!(lesson_id = %id, "Deleted lesson");
    Ok(Json(DeleteLessonResponse { deleted: true }))
}
