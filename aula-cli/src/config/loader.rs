use std::path::PathBuf;

use anyhow::Result;
use directories::ProjectDirs;

use super::types::{
    AulaConfig, ChatSection, ProcessingSection, RawAulaConfig, RawChatSection,
    RawProcessingSection, RawServerSection, ServerSection,
};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<AulaConfig> {
        let mut raw = RawAulaConfig::default();

        // Layer 1: User config
        if let Some(user_path) = Self::user_config_path()
            && user_path.exists()
        {
            let contents = std::fs::read_to_string(&user_path)?;
            let user_config: RawAulaConfig = toml::from_str(&contents)?;
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            let contents = std::fs::read_to_string(&project_path)?;
            let project_config: RawAulaConfig = toml::from_str(&contents)?;
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (platform-specific)
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "aula").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get project config path
    /// Can be overridden with AULA_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("AULA_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".aula/config.toml")
        }
    }

    /// Platform data directory for the durable job queue
    pub fn default_queue_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "aula").map(|dirs| dirs.data_dir().join("queue"))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawAulaConfig, overlay: RawAulaConfig) -> RawAulaConfig {
        RawAulaConfig {
            server: RawServerSection {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            processing: RawProcessingSection {
                chunk_seconds: overlay
                    .processing
                    .chunk_seconds
                    .or(base.processing.chunk_seconds),
                embed_concurrency: overlay
                    .processing
                    .embed_concurrency
                    .or(base.processing.embed_concurrency),
                queue_dir: overlay.processing.queue_dir.or(base.processing.queue_dir),
            },
            chat: RawChatSection {
                match_threshold: overlay.chat.match_threshold.or(base.chat.match_threshold),
                match_count: overlay.chat.match_count.or(base.chat.match_count),
                web_results: overlay.chat.web_results.or(base.chat.web_results),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawAulaConfig) -> AulaConfig {
        let defaults = AulaConfig::default();
        AulaConfig {
            server: ServerSection {
                host: raw.server.host.unwrap_or(defaults.server.host),
                port: raw.server.port.unwrap_or(defaults.server.port),
            },
            processing: ProcessingSection {
                chunk_seconds: raw
                    .processing
                    .chunk_seconds
                    .unwrap_or(defaults.processing.chunk_seconds),
                embed_concurrency: raw
                    .processing
                    .embed_concurrency
                    .unwrap_or(defaults.processing.embed_concurrency),
                queue_dir: raw.processing.queue_dir,
            },
            chat: ChatSection {
                match_threshold: raw
                    .chat
                    .match_threshold
                    .unwrap_or(defaults.chat.match_threshold),
                match_count: raw.chat.match_count.unwrap_or(defaults.chat.match_count),
                web_results: raw.chat.web_results.unwrap_or(defaults.chat.web_results),
            },
        }
    }

    /// Load config from a specific path (for testing)
    #[cfg(test)]
    pub fn load_from_path(path: &std::path::Path) -> Result<AulaConfig> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let raw: RawAulaConfig = toml::from_str(&contents)?;
            Ok(Self::finalize(raw))
        } else {
            Ok(AulaConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::DEFAULT_PORT;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.processing.chunk_seconds, 600);
    }

    #[test]
    fn load_partial_toml_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9999

[processing]
chunk_seconds = 300
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.processing.chunk_seconds, 300);
        assert_eq!(config.processing.embed_concurrency, 4);
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn merge_raw_overlay_overrides_base() {
        let base = RawAulaConfig {
            server: RawServerSection {
                host: Some("127.0.0.1".to_string()),
                port: Some(DEFAULT_PORT),
            },
            processing: RawProcessingSection {
                chunk_seconds: Some(600),
                embed_concurrency: None,
                queue_dir: Some(PathBuf::from("/var/aula/queue")),
            },
            chat: RawChatSection::default(),
        };

        let overlay = RawAulaConfig {
            server: RawServerSection {
                host: Some("0.0.0.0".to_string()),
                port: None,
            },
            processing: RawProcessingSection {
                chunk_seconds: Some(300),
                embed_concurrency: Some(8),
                queue_dir: None,
            },
            chat: RawChatSection::default(),
        };

        let merged = ConfigLoader::merge_raw(base, overlay);

        assert_eq!(merged.server.host, Some("0.0.0.0".to_string()));
        // overlay's None falls through to base value via .or()
        assert_eq!(merged.server.port, Some(DEFAULT_PORT));
        assert_eq!(merged.processing.chunk_seconds, Some(300));
        assert_eq!(merged.processing.embed_concurrency, Some(8));
        assert_eq!(
            merged.processing.queue_dir,
            Some(PathBuf::from("/var/aula/queue"))
        );
    }

    #[test]
    fn user_config_path_mentions_aula() {
        let path = ConfigLoader::user_config_path();
        assert!(path.is_some());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("aula"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
