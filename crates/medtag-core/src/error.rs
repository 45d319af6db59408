//! Error types for the medtag tagging pipeline.
//!
//! Errors are organized by layer: configuration errors abort startup,
//! pipeline errors abort a single request and carry enough context to tell
//! "try again" apart from "fix your input" and "data integrity problem".

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for medtag operations.
#[derive(Error, Debug)]
pub enum MedtagError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Taxonomy download failures
    #[error("Taxonomy download failed: {0}")]
    Download(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-request pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The taxonomy document is missing required fields or cannot be parsed
    #[error("Malformed vocabulary in {path}: {message}")]
    MalformedVocabulary { path: PathBuf, message: String },

    /// A hierarchy walk referenced a concept id absent from the vocabulary.
    /// Indicates index/vocabulary desynchronization.
    #[error("Unknown concept id '{id}' — rebuild the index against the current taxonomy")]
    UnknownConcept { id: String },

    /// The concept index (or its embedding backend) could not be reached
    #[error("Concept index unavailable: {message}")]
    IndexUnavailable {
        message: String,
        status_code: Option<u16>,
    },

    /// Input text is too short to form a single chunk
    #[error("Insufficient input: {tokens} word(s), need roughly {required}+ to form a chunk")]
    InsufficientInput { tokens: usize, required: usize },

    /// Image input could not be decoded or prepared
    #[error("Image input error: {message}")]
    ImageInput { message: String },

    /// Classification/captioning call failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },
}

impl PipelineError {
    /// Whether the failure is worth retrying by the caller.
    ///
    /// Transient: timeouts, unreachable backends, rate limits (429) and
    /// server errors (5xx). Everything else — bad input, auth failures,
    /// vocabulary integrity problems — is not.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Timeout { .. } => true,
            PipelineError::IndexUnavailable {
                status_code,
                message,
            }
            | PipelineError::Llm {
                status_code,
                message,
            } => {
                // Classify by HTTP status code when available (structured)
                if let Some(code) = status_code {
                    return *code == 429 || (500..=599).contains(code);
                }
                // Fallback for non-HTTP errors (connection refused, DNS failure)
                message.contains("timed out") || message.contains("connect")
            }
            _ => false,
        }
    }
}

/// Convenience type alias for medtag results.
pub type Result<T> = std::result::Result<T, MedtagError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_transient() {
        let err = PipelineError::Timeout {
            stage: "index query".to_string(),
            timeout_ms: 30_000,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_rate_limit_is_transient() {
        let err = PipelineError::Llm {
            message: "HTTP 429: rate limit exceeded".to_string(),
            status_code: Some(429),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_index_server_error_is_transient() {
        let err = PipelineError::IndexUnavailable {
            message: "HTTP 503: service unavailable".to_string(),
            status_code: Some(503),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_auth_error_not_transient() {
        let err = PipelineError::Llm {
            message: "HTTP 401: unauthorized".to_string(),
            status_code: Some(401),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_insufficient_input_not_transient() {
        let err = PipelineError::InsufficientInput {
            tokens: 3,
            required: 15,
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_unknown_concept_not_transient() {
        let err = PipelineError::UnknownConcept {
            id: "medtop:99999999".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_connection_error_transient_without_status() {
        let err = PipelineError::IndexUnavailable {
            message: "connection refused".to_string(),
            status_code: None,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_status_digits_in_body_not_transient_without_status() {
        let err = PipelineError::Llm {
            message: "Processed 500 tokens successfully".to_string(),
            status_code: None,
        };
        assert!(!err.is_transient());
    }
}
