//! Chat endpoint: retrieval-augmented answers about one lesson.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Answer returned when neither the lesson passages nor the web search gave
/// anything usable. Short-circuits without calling the completion service.
pub const NO_CONTEXT_ANSWER: &str =
    "Lo siento, no tengo suficiente información de la clase para responder esa pregunta. \
     Intenta reformularla o pregunta a tu profesor.";

/// Placeholder folded into the prompt when the web search failed.
const WEB_UNAVAILABLE: &str = "(búsqueda web no disponible)";

const SYSTEM_PROMPT: &str = "Eres un asistente de una clase de inglés para hispanohablantes. \
     Responde en español, de forma breve y clara. Prefiere siempre el contenido de la clase \
     sobre los resultados de la web; usa la web solo para complementar.";

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(rename = "claseId")]
    pub clase_id: Uuid,
    pub pregunta: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub respuesta: String,
    /// How many lesson passages cleared the similarity threshold.
    pub pasajes: usize,
}

/// POST /api/chat
///
/// Embeds the question, retrieves the nearest lesson passages, folds in a web
/// search as secondary context, and asks the completion service. A failed web
/// search degrades to a placeholder; a failed embedding or completion call is
/// a server error.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.pregunta.trim().is_empty() {
        return Err(ApiError::BadRequest("pregunta must not be empty".into()));
    }
    if state.store.lesson(req.clase_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let query = state.embedder.embed(req.pregunta.trim()).await?;
    let matches = state
        .store
        .match_passages(
            req.clase_id,
            &query,
            state.chat.match_threshold,
            state.chat.match_count,
        )
        .await?;

    let web = match state
        .searcher
        .search(req.pregunta.trim(), state.chat.web_results)
        .await
    {
        Ok(snippets) => snippets,
        Err(e) => {
            tracing::warn!(error = %e, "Web search failed, continuing without it");
            Vec::new()
        }
    };

    if matches.is_empty() && web.is_empty() {
        tracing::debug!(clase_id = %req.clase_id, "No context found for question");
        return Ok(Json(ChatResponse {
            respuesta: NO_CONTEXT_ANSWER.to_string(),
            pasajes: 0,
        }));
    }

    let mut user_prompt = String::new();
    let _ = writeln!(user_prompt, "Contenido de la clase:");
    if matches.is_empty() {
        let _ = writeln!(user_prompt, "(sin pasajes relevantes)");
    }
    for m in &matches {
        let _ = writeln!(user_prompt, "- {}", m.passage.text);
    }
    let _ = writeln!(user_prompt, "\nResultados de la web:");
    if web.is_empty() {
        let _ = writeln!(user_prompt, "{WEB_UNAVAILABLE}");
    }
    for hit in &web {
        let _ = writeln!(user_prompt, "- {}: {} ({})", hit.title, hit.snippet, hit.url);
    }
    let _ = writeln!(user_prompt, "\nPregunta: {}", req.pregunta.trim());

    let respuesta = state.completer.complete(SYSTEM_PROMPT, &user_prompt).await?;
    Ok(Json(ChatResponse {
        respuesta,
        pasajes: matches.len(),
    }))
}
