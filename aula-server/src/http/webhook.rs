//! Webhook receiver for the video host's asset notifications.
//!
//! Only `video.asset.ready` does anything; every other event type is
//! acknowledged and ignored so the sender stops retrying. Malformed ready
//! events (missing lesson id or playback id) are logged and acknowledged too:
//! dropping poison events beats a retry storm. Only a persistence failure is
//! surfaced as a server error, because the sender's retry can actually help
//! there.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aula_queue::ProcessLessonJob;

use crate::error::ApiError;
use crate::state::AppState;

/// Event type emitted when transcoding finished and playback ids exist.
pub const ASSET_READY: &str = "video.asset.ready";

/// Incoming webhook event.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: WebhookData,
}

/// Payload of an asset event.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    /// Our lesson id, carried through the upload.
    pub passthrough: Option<String>,
    /// The video host's asset id.
    pub id: Option<String>,
    #[serde(default)]
    pub playback_ids: Vec<PlaybackId>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackId {
    pub id: String,
}

/// Acknowledgement returned to the sender.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
    /// Whether the event resulted in a queued processing job.
    pub processed: bool,
}

/// POST /webhooks/video
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<WebhookAck>, ApiError> {
    if event.event_type != ASSET_READY {
        tracing::debug!(event_type = %event.event_type, "Ignoring webhook event type");
        return Ok(Json(WebhookAck {
            received: true,
            processed: false,
        }));
    }

    let Some(lesson_id) = event
        .data
        .passthrough
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
    else {
        tracing::warn!(
            passthrough = ?event.data.passthrough,
            "Dropping asset-ready event without a usable lesson id"
        );
        return Ok(Json(WebhookAck {
            received: true,
            processed: false,
        }));
    };

    let (Some(asset_id), Some(playback)) = (event.data.id, event.data.playback_ids.first()) else {
        tracing::warn!(lesson_id = %lesson_id, "Dropping asset-ready event without asset or playback id");
        return Ok(Json(WebhookAck {
            received: true,
            processed: false,
        }));
    };

    // A ready event for a lesson that no longer exists is also poison; the
    // sender retrying it will never succeed.
    match state
        .store
        .set_lesson_asset(lesson_id, &asset_id, &playback.id)
        .await
    {
        Ok(()) => {}
        Err(aula_core::StoreError::LessonNotFound(_)) => {
            tracing::warn!(lesson_id = %lesson_id, "Dropping asset-ready event for unknown lesson");
            return Ok(Json(WebhookAck {
                received: true,
                processed: false,
            }));
        }
        Err(e) => return Err(e.into()),
    }

    // Hand off to the worker; the sender never waits on processing.
    let job = ProcessLessonJob::new(lesson_id, &asset_id);
    let offset = state.queue.append(job).await?;
    tracing::info!(lesson_id = %lesson_id, asset_id = %asset_id, offset, "Queued processing job");

    Ok(Json(WebhookAck {
        received: true,
        processed: true,
    }))
}
