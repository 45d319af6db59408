//! The concept index: a nearest-neighbor store over concept definitions.
//!
//! `ConceptIndex` is the seam the retrieval pipeline depends on; the
//! production implementation pairs an external embedding service with a
//! locally persisted vector store. Index content is a pure function of the
//! vocabulary, so a content-hash check gates the one-time build.

pub mod embedder;
pub mod store;

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::PipelineError;

pub use embedder::{TextEmbedder, TextEmbedderFactory};
pub use store::VectorStore;

/// One embedded unit: key, document text, and the owning concept id.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Entry key (concept id plus `":def"` suffix)
    pub id: String,

    /// Document text to embed (the concept definition)
    pub document: String,

    /// Metadata: the bare concept id
    pub concept_id: String,
}

/// One similarity match returned by a query.
#[derive(Debug, Clone)]
pub struct IndexMatch {
    /// Concept id of the matched entry
    pub concept_id: String,

    /// Similarity score, higher is closer
    pub score: f32,
}

/// Nearest-neighbor index over concept definitions.
#[async_trait]
pub trait ConceptIndex: Send + Sync {
    /// Number of entries currently stored. Zero means "needs building".
    async fn count(&self) -> Result<usize, PipelineError>;

    /// Idempotent bulk write: writing the same key twice replaces the entry.
    async fn upsert(&self, entries: &[IndexEntry]) -> Result<(), PipelineError>;

    /// Top-k similarity query, one result list per query string, each
    /// ordered by descending similarity.
    async fn query(
        &self,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<Vec<IndexMatch>>, PipelineError>;
}

/// Production index: external embedder plus a persisted local vector store.
pub struct EmbeddedIndex {
    embedder: Box<dyn TextEmbedder>,
    store: RwLock<VectorStore>,
    path: PathBuf,
    vocab_hash: String,
    batch_size: usize,
}

impl EmbeddedIndex {
    /// Open the index at `path`, reusing the persisted store only when its
    /// recorded vocabulary hash matches `vocab_hash`.
    ///
    /// A missing or stale store yields an empty index; the caller checks
    /// `count()` and runs the one-time `upsert` to (re)build it.
    pub fn open(
        embedder: Box<dyn TextEmbedder>,
        path: PathBuf,
        vocab_hash: &str,
        batch_size: usize,
    ) -> Result<Self, PipelineError> {
        let store = match VectorStore::load(&path)? {
            Some((store, stored_hash)) if stored_hash == vocab_hash => store,
            Some((store, stored_hash)) => {
                tracing::warn!(
                    "Concept index at {:?} was built from a different vocabulary \
                     (hash {}… vs {}…); it will be rebuilt",
                    path,
                    &stored_hash[..8.min(stored_hash.len())],
                    &vocab_hash[..8.min(vocab_hash.len())],
                );
                drop(store);
                VectorStore::new()
            }
            None => VectorStore::new(),
        };

        Ok(Self {
            embedder,
            store: RwLock::new(store),
            path,
            vocab_hash: vocab_hash.to_string(),
            batch_size,
        })
    }

    /// In-memory index for tests and embedded use; nothing is persisted
    /// until `upsert` runs against a real path.
    #[cfg(test)]
    pub fn in_memory(embedder: Box<dyn TextEmbedder>, dir: &std::path::Path) -> Self {
        Self {
            embedder,
            store: RwLock::new(VectorStore::new()),
            path: dir.join("index.bin"),
            vocab_hash: "test".to_string(),
            batch_size: 16,
        }
    }
}

#[async_trait]
impl ConceptIndex for EmbeddedIndex {
    async fn count(&self) -> Result<usize, PipelineError> {
        Ok(self.store.read().len())
    }

    async fn upsert(&self, entries: &[IndexEntry]) -> Result<(), PipelineError> {
        tracing::info!(
            "Embedding {} concept definitions via {} (one-time build)",
            entries.len(),
            self.embedder.name()
        );

        for batch in entries.chunks(self.batch_size) {
            let documents: Vec<String> = batch.iter().map(|e| e.document.clone()).collect();
            let embeddings = self.embedder.embed_batch(&documents).await?;

            // Embeddings computed before taking the lock; never await while
            // holding it.
            let mut store = self.store.write();
            for (entry, embedding) in batch.iter().zip(embeddings) {
                store.upsert(&entry.id, &entry.concept_id, embedding)?;
            }
        }

        let store = self.store.read();
        store.save(&self.path, &self.vocab_hash)?;
        Ok(())
    }

    async fn query(
        &self,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<Vec<IndexMatch>>, PipelineError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(queries).await?;

        let store = self.store.read();
        embeddings
            .iter()
            .map(|embedding| store.top_k(embedding, top_k))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic embedder for tests: hashes tokens into a fixed number
    /// of buckets, so identical texts embed identically and similar texts
    /// land close together.
    pub struct HashingEmbedder {
        pub dim: usize,
    }

    impl HashingEmbedder {
        pub fn embed_one(&self, text: &str) -> Vec<f32> {
            let mut vector = vec![0.0f32; self.dim];
            for token in text.split_whitespace() {
                let token = token.to_lowercase();
                let hash = blake3::hash(token.as_bytes());
                let bucket = hash.as_bytes()[0] as usize % self.dim;
                vector[bucket] += 1.0;
            }
            vector
        }
    }

    #[async_trait]
    impl TextEmbedder for HashingEmbedder {
        fn name(&self) -> &str {
            "hashing-test"
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts.iter().map(|t| self.embed_one(t)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::HashingEmbedder;
    use super::*;

    fn entries() -> Vec<IndexEntry> {
        vec![
            IndexEntry {
                id: "medtop:1:def".to_string(),
                document: "Overflow of water onto land that is normally dry".to_string(),
                concept_id: "medtop:1".to_string(),
            },
            IndexEntry {
                id: "medtop:2:def".to_string(),
                document: "Elections and electoral politics of national government".to_string(),
                concept_id: "medtop:2".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_upsert_then_exact_definition_query_hits() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddedIndex::in_memory(Box::new(HashingEmbedder { dim: 32 }), dir.path());

        index.upsert(&entries()).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        let queries = vec!["Overflow of water onto land that is normally dry".to_string()];
        let results = index.query(&queries, 2).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0][0].concept_id, "medtop:1");
        assert!(results[0][0].score > 0.99);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddedIndex::in_memory(Box::new(HashingEmbedder { dim: 32 }), dir.path());

        index.upsert(&entries()).await.unwrap();
        index.upsert(&entries()).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_open_reuses_matching_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topics.bin");

        {
            let index = EmbeddedIndex::open(
                Box::new(HashingEmbedder { dim: 32 }),
                path.clone(),
                "hash-a",
                16,
            )
            .unwrap();
            index.upsert(&entries()).await.unwrap();
        }

        // Same hash: reloaded without rebuilding
        let index = EmbeddedIndex::open(
            Box::new(HashingEmbedder { dim: 32 }),
            path.clone(),
            "hash-a",
            16,
        )
        .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        // Different hash: store is stale, starts empty
        let stale =
            EmbeddedIndex::open(Box::new(HashingEmbedder { dim: 32 }), path, "hash-b", 16).unwrap();
        assert_eq!(stale.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_with_mismatched_embedder_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topics.bin");

        {
            let index = EmbeddedIndex::open(
                Box::new(HashingEmbedder { dim: 32 }),
                path.clone(),
                "hash-a",
                16,
            )
            .unwrap();
            index.upsert(&entries()).await.unwrap();
        }

        // Same vocabulary hash, different embedding dimension: the persisted
        // store is reused but queries must fail loudly, not return nothing
        let index =
            EmbeddedIndex::open(Box::new(HashingEmbedder { dim: 16 }), path, "hash-a", 16).unwrap();
        let err = index
            .query(&["Overflow of water".to_string()], 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::IndexUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_query_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let index = EmbeddedIndex::in_memory(Box::new(HashingEmbedder { dim: 32 }), dir.path());
        let results = index.query(&[], 10).await.unwrap();
        assert!(results.is_empty());
    }
}
