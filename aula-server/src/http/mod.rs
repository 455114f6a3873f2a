//! HTTP surface of the aula server.

pub mod api;
pub mod chat;
pub mod lessons;
pub mod progress;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::{Extension, Router, middleware};
use tower_http::cors::CorsLayer;

use crate::middleware::{AuthLayer, auth_middleware};
use crate::state::AppState;

/// Build the router.
///
/// Three auth zones: the webhook and health check are open (the webhook's
/// sender cannot hold our token), the processing trigger is guarded by its
/// own shared secret inside the handler, and everything else under /api
/// requires the bearer token when one is configured.
pub fn create_router(state: Arc<AppState>, auth_layer: AuthLayer) -> Router {
    let protected = Router::new()
        .route("/api/clases", post(lessons::create_lesson))
        .route("/api/clases/:id", delete(lessons::delete_lesson))
        .route("/api/chat", post(chat::chat))
        .route("/api/progress", post(progress::save_progress))
        .route(
            "/api/progress/:student_id/:clase_id",
            get(progress::get_progress),
        )
        .route("/api/rutas/:ruta_id/assign", post(progress::assign_route))
        .route(
            "/api/rutas/:ruta_id/resume/:student_id",
            get(progress::resume),
        )
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(auth_layer));

    Router::new()
        .route("/webhooks/video", post(webhook::receive))
        .route("/api/clases/process", post(lessons::process_lesson))
        .route("/api/health", get(api::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
