use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default host for the aula server
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port for the aula server
pub const DEFAULT_PORT: u16 = 8420;

/// Configuration as stored in TOML files (optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAulaConfig {
    #[serde(default)]
    pub server: RawServerSection,

    #[serde(default)]
    pub processing: RawProcessingSection,

    #[serde(default)]
    pub chat: RawChatSection,
}

/// Server section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerSection {
    /// Host to bind to
    pub host: Option<String>,

    /// Port for the aula server
    pub port: Option<u16>,
}

/// Processing section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProcessingSection {
    /// Audio chunk length in seconds
    pub chunk_seconds: Option<u64>,

    /// Concurrent embedding requests
    pub embed_concurrency: Option<usize>,

    /// Directory for the durable job queue
    pub queue_dir: Option<PathBuf>,
}

/// Chat retrieval section as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawChatSection {
    /// Minimum similarity for a passage to count as context
    pub match_threshold: Option<f32>,

    /// Passages fed into the prompt
    pub match_count: Option<usize>,

    /// Web search hits folded in as secondary context
    pub web_results: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AulaConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub processing: ProcessingSection,

    #[serde(default)]
    pub chat: ChatSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSection {
    pub chunk_seconds: u64,
    pub embed_concurrency: usize,
    /// Directory for the durable job queue; resolved to the platform data
    /// directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_dir: Option<PathBuf>,
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            chunk_seconds: 600,
            embed_concurrency: 4,
            queue_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSection {
    pub match_threshold: f32,
    pub match_count: usize,
    pub web_results: usize,
}

impl Default for ChatSection {
    fn default() -> Self {
        Self {
            match_threshold: 0.78,
            match_count: 5,
            web_results: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = AulaConfig::default();
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.processing.chunk_seconds, 600);
        assert!(config.processing.queue_dir.is_none());
        assert_eq!(config.chat.match_count, 5);
    }

    #[test]
    fn raw_config_partial_parsing() {
        let toml_str = r#"
[server]
port = 9000

[chat]
match_threshold = 0.6
"#;
        let raw: RawAulaConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(raw.server.port, Some(9000));
        assert!(raw.server.host.is_none());
        assert_eq!(raw.chat.match_threshold, Some(0.6));
        assert!(raw.processing.chunk_seconds.is_none());
    }

    #[test]
    fn toml_round_trip() {
        let config = AulaConfig {
            server: ServerSection {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            ..Default::default()
        };

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AulaConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.server.host, "0.0.0.0");
        assert_eq!(parsed.server.port, 8080);
    }
}
