//! Retrieval orchestration: chunk, query, walk, aggregate, memoize.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrievalConfig;
use crate::error::PipelineError;
use crate::index::ConceptIndex;
use crate::taxonomy::{hierarchy, Vocabulary};
use crate::types::RankedConcept;

use super::aggregate::aggregate;
use super::cache::ResultCache;
use super::chunker::chunk;

/// The retrieval pipeline: free text in, ranked concept table out.
///
/// Holds shared read-only handles to the vocabulary and index; safe to call
/// from concurrent requests after the one-time index build.
pub struct Retriever {
    vocabulary: Arc<Vocabulary>,
    index: Arc<dyn ConceptIndex>,
    cache: ResultCache<Vec<RankedConcept>>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        index: Arc<dyn ConceptIndex>,
        config: RetrievalConfig,
    ) -> Self {
        let cache = ResultCache::new(
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            vocabulary,
            index,
            cache,
            config,
        }
    }

    /// Retrieve the ranked concept table for `text`.
    ///
    /// Fails with `InsufficientInput` (without touching the index) when the
    /// text is too short to form a single chunk, and with `UnknownConcept`
    /// when a match references an id missing from the vocabulary.
    pub async fn retrieve(&self, text: &str) -> Result<Vec<RankedConcept>, PipelineError> {
        let key = ResultCache::<Vec<RankedConcept>>::make_key(
            text,
            self.config.window_size,
            self.config.stride,
            self.config.top_k,
            self.config.top_n,
        );
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Retrieval cache hit ({} rows)", cached.len());
            return Ok(cached);
        }

        let chunks = chunk(text, self.config.window_size, self.config.stride);
        if chunks.is_empty() {
            return Err(PipelineError::InsufficientInput {
                tokens: text.split_whitespace().count(),
                required: self.config.window_size,
            });
        }

        let start = std::time::Instant::now();
        let per_chunk = self.index.query(&chunks, self.config.top_k).await?;
        tracing::debug!(
            "Index query: {} chunks, {} matches in {:?}",
            chunks.len(),
            per_chunk.iter().map(|m| m.len()).sum::<usize>(),
            start.elapsed()
        );

        let mut pairs: Vec<(String, String)> = Vec::new();
        for matches in &per_chunk {
            for hit in matches {
                pairs.extend(hierarchy::walk(&self.vocabulary, &hit.concept_id)?);
            }
        }

        let ranked = aggregate(&pairs, self.config.top_n);
        tracing::debug!(
            "Aggregated {} hierarchy pairs into {} ranked concepts",
            pairs.len(),
            ranked.len()
        );

        self.cache.set(&key, ranked.clone());
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexEntry, IndexMatch};
    use crate::taxonomy::vocabulary::TaxonomyDocument;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Index stub that maps trigger words in a query chunk to fixed concept
    /// ids and counts how often `query` runs.
    struct StubIndex {
        triggers: HashMap<&'static str, &'static str>,
        query_calls: AtomicUsize,
    }

    impl StubIndex {
        fn new(triggers: &[(&'static str, &'static str)]) -> Self {
            Self {
                triggers: triggers.iter().copied().collect(),
                query_calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.query_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConceptIndex for StubIndex {
        async fn count(&self) -> Result<usize, PipelineError> {
            Ok(self.triggers.len())
        }

        async fn upsert(&self, _entries: &[IndexEntry]) -> Result<(), PipelineError> {
            Ok(())
        }

        async fn query(
            &self,
            queries: &[String],
            _top_k: usize,
        ) -> Result<Vec<Vec<IndexMatch>>, PipelineError> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            Ok(queries
                .iter()
                .map(|q| {
                    self.triggers
                        .iter()
                        .filter(|(word, _)| q.contains(*word))
                        .map(|(_, id)| IndexMatch {
                            concept_id: id.to_string(),
                            score: 0.9,
                        })
                        .collect()
                })
                .collect())
        }
    }

    fn vocabulary() -> Arc<Vocabulary> {
        let json = serde_json::json!({
            "conceptSet": [
                {
                    "qcode": "medtop:06000000",
                    "prefLabel": {"en-US": "environment"},
                    "definition": {"en-US": "All aspects of the ecosystem."},
                    "broader": []
                },
                {
                    "qcode": "medtop:11000000",
                    "prefLabel": {"en-US": "politics and government"},
                    "definition": {"en-US": "The art or science of governing."},
                    "broader": []
                },
                {
                    "qcode": "medtop:03000000",
                    "prefLabel": {"en-US": "disaster and accident"},
                    "definition": {"en-US": "Man-made or natural calamities."},
                    "broader": []
                },
                {
                    "qcode": "medtop:20000418",
                    "prefLabel": {"en-US": "flood"},
                    "definition": {"en-US": "Overflow of water onto dry land."},
                    "broader": [
                        "https://cv.iptc.org/newscodes/mediatopic/03000000",
                        "https://cv.iptc.org/newscodes/mediatopic/06000000"
                    ]
                },
                {
                    "qcode": "medtop:20000621",
                    "prefLabel": {"en-US": "environmental policy"},
                    "definition": {"en-US": "Government programmes for the environment."},
                    "broader": [
                        "https://cv.iptc.org/newscodes/mediatopic/06000000",
                        "https://cv.iptc.org/newscodes/mediatopic/11000000"
                    ]
                }
            ],
            "hasTopConcept": []
        });
        let document: TaxonomyDocument = serde_json::from_value(json).unwrap();
        Arc::new(Vocabulary::from_document(document, "en-US", Path::new("test.json")).unwrap())
    }

    fn paragraph() -> &'static str {
        "Heavy flooding has again devastated the river delta while lawmakers \
         debate a sweeping environmental policy package intended to fund \
         stronger levees and wetland restoration"
    }

    fn retriever(index: Arc<StubIndex>) -> Retriever {
        Retriever::new(vocabulary(), index, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_flooding_scenario_ranks_broad_topics() {
        let index = Arc::new(StubIndex::new(&[
            ("flooding", "medtop:20000418"),
            ("policy", "medtop:20000621"),
        ]));
        let retriever = retriever(index);

        let ranked = retriever.retrieve(paragraph()).await.unwrap();

        let environment = ranked.iter().find(|r| r.label == "environment").unwrap();
        let politics = ranked
            .iter()
            .find(|r| r.label == "politics and government")
            .unwrap();
        let flood = ranked.iter().find(|r| r.label == "flood").unwrap();

        // "environment" is an ancestor of both leaves, so it accumulates at
        // least as many counts as either leaf alone
        assert!(environment.count >= flood.count);
        assert!(politics.count >= 1);
        assert!(!flood.definition.is_empty());
    }

    #[tokio::test]
    async fn test_short_input_never_queries_index() {
        let index = Arc::new(StubIndex::new(&[]));
        let retriever = retriever(index.clone());

        let err = retriever.retrieve("too short").await.unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientInput { tokens: 2, .. }));
        assert_eq!(index.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_skips_second_index_query() {
        let index = Arc::new(StubIndex::new(&[("flooding", "medtop:20000418")]));
        let retriever = retriever(index.clone());

        let first = retriever.retrieve(paragraph()).await.unwrap();
        let second = retriever.retrieve(paragraph()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(index.calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_concept_aborts_retrieval() {
        let index = Arc::new(StubIndex::new(&[("flooding", "medtop:99999999")]));
        let retriever = retriever(index);

        let err = retriever.retrieve(paragraph()).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownConcept { .. }));
    }

    #[tokio::test]
    async fn test_top_n_truncation_applies() {
        let index = Arc::new(StubIndex::new(&[
            ("flooding", "medtop:20000418"),
            ("policy", "medtop:20000621"),
        ]));
        let config = RetrievalConfig {
            top_n: 2,
            ..Default::default()
        };
        let retriever = Retriever::new(vocabulary(), index, config);

        let ranked = retriever.retrieve(paragraph()).await.unwrap();
        assert!(ranked.len() <= 2);
    }
}
