//! Sub-configuration structs with defaults matching the observed pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the taxonomy cache and the persisted index
    pub data_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.medtag"),
        }
    }
}

/// Taxonomy source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxonomyConfig {
    /// Controlled-vocabulary publisher endpoint
    pub url: String,

    /// Language tag used for labels/definitions lookup
    pub lang: String,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            url: "https://cv.iptc.org/newscodes/mediatopic?lang=en-US&format=json".to_string(),
            lang: "en-US".to_string(),
        }
    }
}

/// Retrieval pipeline settings.
///
/// `window_size`/`stride` shape the chunker; `top_k` is matches per chunk;
/// `top_n` truncates the ranked table (observed deployments use 25 or 50).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Words per chunk window
    pub window_size: usize,

    /// Window advance in words
    pub stride: usize,

    /// Similarity matches returned per chunk
    pub top_k: usize,

    /// Rows kept in the ranked concept table
    pub top_n: usize,

    /// Result cache time-to-live in seconds
    pub cache_ttl_secs: u64,

    /// Result cache capacity (entries)
    pub cache_capacity: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            window_size: 15,
            stride: 5,
            top_k: 10,
            top_n: 50,
            cache_ttl_secs: 3600,
            cache_capacity: 256,
        }
    }
}

/// Concept index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Collection name; also the persisted matrix file stem
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            collection: "media_topics".to_string(),
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider identifier ("ollama" or "openai")
    pub provider: String,

    /// Ollama (local) embedding configuration
    pub ollama: Option<OllamaEmbeddingConfig>,

    /// OpenAI embedding configuration
    pub openai: Option<OpenAiEmbeddingConfig>,

    /// Documents embedded per request during the one-time index build
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            ollama: None,
            openai: None,
            batch_size: 64,
        }
    }
}

/// Ollama embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaEmbeddingConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Embedding model name
    pub model: String,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
        }
    }
}

/// OpenAI embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiEmbeddingConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Embedding model name
    pub model: String,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "text-embedding-3-small".to_string(),
        }
    }
}

/// Resource limits and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Embedding call timeout in milliseconds
    pub embed_timeout_ms: u64,

    /// LLM call timeout in milliseconds
    pub llm_timeout_ms: u64,

    /// Taxonomy download timeout in milliseconds (covers the full transfer)
    pub download_timeout_ms: u64,

    /// Longest image edge after input resize, in pixels
    pub image_max_edge: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            embed_timeout_ms: 30_000,
            llm_timeout_ms: 60_000,
            download_timeout_ms: 120_000,
            image_max_edge: 800,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// LLM classification provider configurations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Default provider identifier ("gemini" or "openai")
    pub provider: String,

    /// Sampling temperature for classification calls
    pub temperature: f32,

    /// Gemini configuration
    pub gemini: Option<GeminiConfig>,

    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            temperature: 1.0,
            gemini: None,
            openai: None,
        }
    }
}

/// Gemini configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: "${GOOGLE_AI_API_KEY}".to_string(),
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}
