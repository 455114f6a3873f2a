//! Web search client used as a secondary context source for chat.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// One search hit folded into the chat prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSnippet {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Runs a web search for supplementary context.
///
/// Callers treat failures as non-fatal: a failed search degrades to a
/// placeholder, it never aborts the chat request.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchSnippet>>;
}

/// Client for the Serper search JSON API.
#[derive(Clone, Debug)]
pub struct SerperSearcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl SerperSearcher {
    /// Build a new search client.
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig("missing search API key".into()));
        }
        Ok(Self {
            client,
            endpoint: "https://google.serper.dev/search".to_string(),
            api_key,
        })
    }

    /// Override the endpoint (tests).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl WebSearcher for SerperSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchSnippet>> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: query })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".into());
            return Err(ProviderError::Api {
                service: "web search",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = resp.json().await?;
        Ok(parsed
            .organic
            .into_iter()
            .take(max_results)
            .map(|hit| SearchSnippet {
                title: hit.title,
                snippet: hit.snippet.unwrap_or_default(),
                url: hit.link,
            })
            .collect())
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicHit>,
}

#[derive(Debug, Deserialize)]
struct OrganicHit {
    title: String,
    #[serde(default)]
    snippet: Option<String>,
    link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_api_key() {
        let err = SerperSearcher::new(reqwest::Client::new(), " ").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }

    #[test]
    fn parses_organic_hits() {
        let raw = r#"{"organic":[{"title":"Past continuous","snippet":"Usage notes","link":"https://example.com"}]}"#;
        let parsed: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.organic.len(), 1);
        assert_eq!(parsed.organic[0].title, "Past continuous");
    }
}
