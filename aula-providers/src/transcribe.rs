//! Speech-to-text client for OpenAI-compatible audio endpoints.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, Result};

/// Default priming prompt: bilingual grammar-class vocabulary the lessons use
/// constantly, which the model otherwise mishears.
pub(crate) const DEFAULT_PROMPT: &str = "Clase de gramática de inglés para hispanohablantes: \
present simple, past continuous, phrasal verbs, listening, vocabulary, \
sujeto, verbo, complemento, pronunciación.";

/// Transcribes one audio chunk to text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `path`.
    async fn transcribe(&self, path: &Path) -> Result<String>;
}

/// Client for OpenAI-compatible `/audio/transcriptions` endpoints.
#[derive(Clone, Debug)]
pub struct WhisperApiTranscriber {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    language: String,
    prompt: String,
}

impl WhisperApiTranscriber {
    /// Build a new transcription client.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("missing transcription API key".into()));
        }
        Ok(Self {
            client,
            endpoint: format!("{}/audio/transcriptions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            language: "es".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
        })
    }

    /// Override the fixed source-language hint.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Override the domain priming prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Transcriber for WhisperApiTranscriber {
    async fn transcribe(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "chunk.mp3".to_string());
        debug!(file = %file_name, bytes = bytes.len(), "Uploading audio chunk for transcription");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("prompt", self.prompt.clone())
            .text("response_format", "json");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".into());
            return Err(ProviderError::Api {
                service: "transcription",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = resp.json().await?;
        Ok(parsed.text)
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_spanish_language_hint() {
        let transcriber = WhisperApiTranscriber::new(
            reqwest::Client::new(),
            "https://api.openai.com/v1",
            "sk-test",
            "whisper-1",
        )
        .unwrap();
        assert_eq!(transcriber.language, "es");
        assert!(transcriber.prompt.contains("phrasal verbs"));
    }

    #[test]
    fn rejects_blank_api_key() {
        let err = WhisperApiTranscriber::new(
            reqwest::Client::new(),
            "https://api.openai.com/v1",
            "",
            "whisper-1",
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }
}
