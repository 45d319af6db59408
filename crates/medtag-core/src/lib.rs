//! Medtag Core - Controlled-vocabulary auto-tagging library.
//!
//! Medtag tags text or image content with IPTC Media Topics concepts by
//! combining semantic retrieval over a concept embedding index with an
//! optional LLM classification step.
//!
//! # Architecture
//!
//! ```text
//! Text → Chunk → Concept Index (similarity) → Hierarchy Walk → Aggregate
//!      → ranked candidates → LLM classify (constrained to candidates) → tags
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use medtag_core::{Config, Tagger};
//!
//! #[tokio::main]
//! async fn main() -> medtag_core::Result<()> {
//!     let config = Config::load()?;
//!     let tagger = Tagger::new(config).await?;
//!
//!     let result = tagger.retrieve("Severe flooding hit the coast...").await?;
//!     println!("Candidates: {result:?}");
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod index;
pub mod input;
pub mod llm;
pub mod retrieval;
pub mod taxonomy;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, MedtagError, PipelineError, PipelineResult, Result};
pub use index::{ConceptIndex, EmbeddedIndex, TextEmbedderFactory};
pub use llm::{ClassifierFactory, ImageInput, TopicClassifier};
pub use retrieval::Retriever;
pub use taxonomy::Vocabulary;
pub use types::{CaptionResult, Concept, RankedConcept, TagResult};

use std::sync::Arc;

use llm::{CaptionRequest, ClassifyInput, ClassifyRequest, VocabularyEntry};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The tagging service - the main entry point for retrieval and tagging.
///
/// Owns the vocabulary and concept index and builds them once at
/// construction; all handles are shared read-only afterwards, so a `Tagger`
/// can serve concurrent requests.
pub struct Tagger {
    config: Config,
    vocabulary: Arc<Vocabulary>,
    retriever: Retriever,
}

impl Tagger {
    /// Create a new Tagger with the given configuration.
    ///
    /// Loads the vocabulary from the configured taxonomy path (failing with
    /// a pointer to `medtag taxonomy download` when absent), opens the
    /// persisted concept index, and runs the one-time embed-and-upsert if
    /// the index is empty or was built from a different vocabulary.
    pub async fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing medtag v{VERSION}");

        let vocabulary = Arc::new(Vocabulary::load(
            &config.taxonomy_path(),
            &config.taxonomy.lang,
        )?);

        let embedder = TextEmbedderFactory::create(&config.embedding, &config.limits)?;
        let index_path = config.index_path();
        if let Some(parent) = index_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let index = EmbeddedIndex::open(
            embedder,
            index_path,
            &vocabulary.content_hash(),
            config.embedding.batch_size,
        )?;
        let index: Arc<dyn ConceptIndex> = Arc::new(index);

        if index.count().await? == 0 {
            let entries = vocabulary.index_entries();
            tracing::info!("Building concept index ({} entries)", entries.len());
            index.upsert(&entries).await?;
        }

        Ok(Self::from_parts(config, vocabulary, index))
    }

    /// Assemble a Tagger from pre-built parts. Used by tests and embedders
    /// that manage their own index.
    pub fn from_parts(
        config: Config,
        vocabulary: Arc<Vocabulary>,
        index: Arc<dyn ConceptIndex>,
    ) -> Self {
        let retriever = Retriever::new(vocabulary.clone(), index, config.retrieval.clone());
        Self {
            config,
            vocabulary,
            retriever,
        }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the loaded vocabulary.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Retrieve the ranked candidate concepts for a piece of text.
    pub async fn retrieve(&self, text: &str) -> PipelineResult<Vec<RankedConcept>> {
        self.retriever.retrieve(text).await
    }

    /// Tag text: retrieve candidates, then (optionally) have the classifier
    /// pick the labels that actually apply.
    pub async fn tag_text(
        &self,
        text: &str,
        classifier: Option<&dyn TopicClassifier>,
    ) -> PipelineResult<TagResult> {
        let retrieved = self.retriever.retrieve(text).await?;

        let Some(classifier) = classifier else {
            return Ok(TagResult {
                retrieved,
                keywords: Vec::new(),
                model: None,
            });
        };

        let request = ClassifyRequest {
            input: ClassifyInput::Text(text.to_string()),
            candidates: VocabularyEntry::from_ranked(&retrieved),
            temperature: self.config.llm.temperature,
        };
        let response = classifier.classify(&request).await?;
        tracing::info!(
            "{} selected {} of {} candidates in {}ms",
            classifier.name(),
            response.keywords.len(),
            retrieved.len(),
            response.latency_ms
        );

        Ok(TagResult {
            retrieved,
            keywords: response.keywords,
            model: Some(response.model),
        })
    }

    /// Caption an image and name the broad topics it depicts, then run the
    /// caption text through retrieval and classify the image against the
    /// resulting candidates.
    pub async fn tag_image(
        &self,
        image: ImageInput,
        classifier: &dyn TopicClassifier,
    ) -> PipelineResult<(CaptionResult, TagResult)> {
        // Pass 1: caption against the broad topics so the text pipeline has
        // something to retrieve with
        let broad: Vec<VocabularyEntry> = self
            .vocabulary
            .broad_topics()
            .iter()
            .map(|c| VocabularyEntry {
                label: c.label.clone(),
                definition: c.definition.clone(),
            })
            .collect();

        let caption = classifier
            .caption(&CaptionRequest {
                image: image.clone(),
                candidates: broad,
                temperature: self.config.llm.temperature,
            })
            .await?;
        tracing::debug!("Caption: {}", caption.caption);

        // Pass 2: retrieval over caption + depicted topics, then classify
        // the image against the retrieved candidates
        let query = format!("{} {}", caption.caption, caption.concepts.join(" "));
        let retrieved = self.retriever.retrieve(&query).await?;

        let request = ClassifyRequest {
            input: ClassifyInput::Image(image),
            candidates: VocabularyEntry::from_ranked(&retrieved),
            temperature: self.config.llm.temperature,
        };
        let response = classifier.classify(&request).await?;

        let caption_result = CaptionResult {
            caption: caption.caption,
            concepts: caption.concepts,
        };
        let tag_result = TagResult {
            retrieved,
            keywords: response.keywords,
            model: Some(response.model),
        };
        Ok((caption_result, tag_result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }
}
