//! Configuration management for medtag.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults; every section can be omitted from the TOML file.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for medtag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Taxonomy source settings
    pub taxonomy: TaxonomyConfig,

    /// Retrieval pipeline settings
    pub retrieval: RetrievalConfig,

    /// Concept index settings
    pub index: IndexConfig,

    /// Embedding service settings
    pub embedding: EmbeddingConfig,

    /// Resource limits and timeouts
    pub limits: LimitsConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// LLM classification provider settings
    pub llm: LlmConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.medtag.medtag/config.toml
    /// - Linux: ~/.config/medtag/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\medtag\config\config.toml
    ///
    /// Falls back to ~/.medtag/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "medtag", "medtag")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".medtag").join("config.toml")
            })
    }

    /// Get the resolved data directory path (with ~ expansion).
    pub fn data_dir(&self) -> PathBuf {
        let path_str = self.general.data_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Local cache path of the taxonomy JSON document.
    ///
    /// One file per language, e.g. `~/.medtag/taxonomy/mediatopic-en-US.json`.
    pub fn taxonomy_path(&self) -> PathBuf {
        self.data_dir()
            .join("taxonomy")
            .join(format!("mediatopic-{}.json", self.taxonomy.lang))
    }

    /// Path of the persisted concept index matrix.
    ///
    /// The `.meta` sidecar (vocabulary hash, entry ids) lives next to it.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir()
            .join("index")
            .join(format!("{}.bin", self.index.collection))
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retrieval.window_size, 15);
        assert_eq!(config.retrieval.stride, 5);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.top_n, 50);
        assert_eq!(config.retrieval.cache_ttl_secs, 3600);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[taxonomy]"));
        assert!(toml.contains("[retrieval]"));
        assert!(toml.contains("[embedding]"));
    }

    #[test]
    fn test_taxonomy_path_tracks_language() {
        let mut config = Config::default();
        config.taxonomy.lang = "de".to_string();
        assert!(config
            .taxonomy_path()
            .to_string_lossy()
            .ends_with("taxonomy/mediatopic-de.json"));
    }

    #[test]
    fn test_index_path_uses_collection_name() {
        let config = Config::default();
        assert!(config
            .index_path()
            .to_string_lossy()
            .ends_with("index/media_topics.bin"));
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[retrieval]\ntop_n = 25\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retrieval.top_n, 25);
        // Untouched sections keep their defaults
        assert_eq!(config.retrieval.window_size, 15);
        assert_eq!(config.taxonomy.lang, "en-US");
    }
}
