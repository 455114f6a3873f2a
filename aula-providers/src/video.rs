//! Video host client (Mux-style direct uploads and asset lookups).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, Result};

/// A direct-upload slot created at the video host.
#[derive(Debug, Clone)]
pub struct DirectUpload {
    /// URL the browser PUTs the raw video to.
    pub upload_url: String,
    /// Host-side id of the upload slot.
    pub upload_id: String,
}

/// Talks to the hosted video pipeline.
#[async_trait]
pub trait VideoHost: Send + Sync {
    /// Create a direct-upload slot whose resulting asset carries
    /// `passthrough` (our lesson id) back through the webhook.
    async fn create_direct_upload(&self, passthrough: &str) -> Result<DirectUpload>;

    /// Resolve a URL the processing job can download the source media from.
    async fn download_url(&self, asset_id: &str) -> Result<String>;
}

/// Client for the Mux video API.
#[derive(Clone, Debug)]
pub struct MuxVideoHost {
    client: reqwest::Client,
    api_base: String,
    stream_base: String,
    token_id: String,
    token_secret: String,
}

impl MuxVideoHost {
    /// Build a new video host client with API token credentials.
    pub fn new(
        client: reqwest::Client,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Result<Self> {
        let token_id = token_id.into();
        let token_secret = token_secret.into();
        if token_id.trim().is_empty() || token_secret.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("missing video host API token".into()));
        }
        Ok(Self {
            client,
            api_base: "https://api.mux.com".to_string(),
            stream_base: "https://stream.mux.com".to_string(),
            token_id,
            token_secret,
        })
    }

    /// Override the API base URL (tests).
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Override the streaming base URL (tests).
    #[must_use]
    pub fn with_stream_base(mut self, base: impl Into<String>) -> Self {
        self.stream_base = base.into();
        self
    }
}

#[async_trait]
impl VideoHost for MuxVideoHost {
    async fn create_direct_upload(&self, passthrough: &str) -> Result<DirectUpload> {
        let body = CreateUploadRequest {
            cors_origin: "*",
            new_asset_settings: NewAssetSettings {
                playback_policy: ["public"],
                passthrough,
            },
        };

        let resp = self
            .client
            .post(format!("{}/video/v1/uploads", self.api_base))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".into());
            return Err(ProviderError::Api {
                service: "video host",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CreateUploadResponse = resp.json().await?;
        debug!(upload_id = %parsed.data.id, "Created direct upload slot");
        Ok(DirectUpload {
            upload_url: parsed.data.url,
            upload_id: parsed.data.id,
        })
    }

    async fn download_url(&self, asset_id: &str) -> Result<String> {
        let resp = self
            .client
            .get(format!("{}/video/v1/assets/{asset_id}", self.api_base))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".into());
            return Err(ProviderError::Api {
                service: "video host",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AssetResponse = resp.json().await?;
        let playback = parsed
            .data
            .playback_ids
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::UnexpectedPayload {
                service: "video host",
                detail: format!("asset {asset_id} has no playback ids"),
            })?;

        // The low-bitrate static rendition is plenty for transcription.
        Ok(format!("{}/{}/low.mp4", self.stream_base, playback.id))
    }
}

#[derive(Serialize)]
struct CreateUploadRequest<'a> {
    cors_origin: &'a str,
    new_asset_settings: NewAssetSettings<'a>,
}

#[derive(Serialize)]
struct NewAssetSettings<'a> {
    playback_policy: [&'a str; 1],
    passthrough: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateUploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    data: AssetData,
}

#[derive(Debug, Deserialize)]
struct AssetData {
    #[serde(default)]
    playback_ids: Vec<PlaybackId>,
}

#[derive(Debug, Deserialize)]
struct PlaybackId {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_credentials() {
        let err = MuxVideoHost::new(reqwest::Client::new(), "", "secret").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }

    #[test]
    fn base_urls_are_overridable() {
        let host = MuxVideoHost::new(reqwest::Client::new(), "id", "secret")
            .unwrap()
            .with_api_base("http://localhost:9999")
            .with_stream_base("http://localhost:9998");
        assert_eq!(host.api_base, "http://localhost:9999");
        assert_eq!(host.stream_base, "http://localhost:9998");
    }
}
