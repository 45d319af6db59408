//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.window_size must be > 0".into(),
            ));
        }
        if self.retrieval.stride == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.stride must be > 0".into(),
            ));
        }
        if self.retrieval.stride > self.retrieval.window_size {
            return Err(ConfigError::ValidationError(
                "retrieval.stride must not exceed retrieval.window_size".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be > 0".into(),
            ));
        }
        if self.retrieval.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_n must be > 0".into(),
            ));
        }
        if self.retrieval.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.cache_capacity must be > 0".into(),
            ));
        }
        if self.index.collection.is_empty() {
            return Err(ConfigError::ValidationError(
                "index.collection must not be empty".into(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be > 0".into(),
            ));
        }
        if self.limits.embed_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.embed_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.download_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.download_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.image_max_edge == 0 {
            return Err(ConfigError::ValidationError(
                "limits.image_max_edge must be > 0".into(),
            ));
        }
        Ok(())
    }
}
