//! Retrieval over the persisted document index.
//!
//! `IndexHandle` pairs a loaded `VectorStore` with the `Embedder` that was
//! used to build it and answers "top-K chunks for this question".

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::config::RuntimeConfig;

mod embedder;
mod store;

pub use embedder::{Embedder, EmbeddingError, OllamaEmbedder, OllamaEmbedderBuilder};
pub use store::{
    INDEX_FILE_NAME, IndexFile, StoredChunk, VectorStore, cosine_similarity, index_file_path,
};

/// A span of a source document, the unit of retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    pub content: String,
    /// Originating document identifier, usually a file path.
    pub source: String,
    /// Positional metadata carried through from ingestion, opaque here.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DocumentChunk {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// A retrieved chunk and its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Errors that prevent the index from being opened.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("no index found at {0}")]
    Missing(PathBuf),

    #[error("failed to read index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("index was built with embeddings model {stored:?} but {configured:?} is configured")]
    ModelMismatch { stored: String, configured: String },

    #[error("failed to set up embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Errors raised by a single search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("query embedding has {actual} dimensions, index expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for anything that can rank chunks for a question.
///
/// Implementations must be safe to call from any thread and must return the
/// same ordering for the same query against the same data.
pub trait Retriever: Send + Sync {
    /// Returns at most `k` chunks in descending relevance order.
    fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, SearchError>;
}

/// Handle over the persisted vector store plus its embedding function.
pub struct IndexHandle {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    chunk_limit: usize,
}

impl IndexHandle {
    /// Opens the index described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an `IndexError` if the store is missing or unreadable, if the
    /// embeddings client cannot be built, or if the store was built with a
    /// different embeddings model.
    pub fn open(config: &RuntimeConfig) -> Result<Self, IndexError> {
        let embedder = OllamaEmbedderBuilder::new()
            .base_url(&config.embeddings_host)
            .model(&config.embeddings_model_name)
            .build()?;
        let store = VectorStore::open(&config.index_location)?;

        tracing::info!(
            path = %config.index_location.display(),
            chunks = store.len(),
            dimensions = ?store.dimensions(),
            "opened vector store"
        );

        Self::new(store, Arc::new(embedder), config.retrieved_chunk_count)
    }

    /// Assembles a handle from an already loaded store and embedder.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::ModelMismatch` if the store and embedder disagree
    /// on the embeddings model.
    pub fn new(
        store: VectorStore,
        embedder: Arc<dyn Embedder>,
        chunk_limit: usize,
    ) -> Result<Self, IndexError> {
        if store.embeddings_model() != embedder.model_name() {
            return Err(IndexError::ModelMismatch {
                stored: store.embeddings_model().to_string(),
                configured: embedder.model_name().to_string(),
            });
        }

        Ok(Self {
            store,
            embedder,
            chunk_limit,
        })
    }

    /// Returns the number of chunks in the underlying store.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Retriever for IndexHandle {
    fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>, SearchError> {
        let k = k.min(self.chunk_limit);
        if k == 0 || self.store.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query)?;
        if let Some(expected) = self.store.dimensions()
            && expected != query_embedding.len()
        {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: query_embedding.len(),
            });
        }

        let results = self.store.nearest(&query_embedding, k);
        tracing::debug!(k, hits = results.len(), "search complete");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds text as keyword presence over a tiny fixed vocabulary.
    struct KeywordEmbedder {
        calls: AtomicUsize,
    }

    const VOCAB: [&str; 3] = ["refund", "shipping", "warranty"];

    impl KeywordEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Embedder for KeywordEmbedder {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = text.to_lowercase();
            Ok(VOCAB
                .iter()
                .map(|w| if text.contains(w) { 1.0 } else { 0.0 })
                .collect())
        }

        fn model_name(&self) -> &str {
            "keywords"
        }
    }

    fn stored(content: &str, source: &str, embedding: Vec<f32>) -> StoredChunk {
        StoredChunk {
            content: content.to_string(),
            source: source.to_string(),
            metadata: BTreeMap::new(),
            embedding,
        }
    }

    fn handle(chunks: Vec<StoredChunk>, limit: usize) -> IndexHandle {
        let store = VectorStore::from_index_file(IndexFile {
            embeddings_model: "keywords".to_string(),
            chunks,
        })
        .expect("valid store");
        IndexHandle::new(store, Arc::new(KeywordEmbedder::new()), limit).expect("valid handle")
    }

    fn refund_chunks() -> Vec<StoredChunk> {
        vec![
            stored("Refunds within 30 days.", "policy.md", vec![1.0, 0.0, 0.0]),
            stored("Contact support for refunds.", "faq.md", vec![1.0, 0.0, 0.1]),
        ]
    }

    #[test]
    fn k_is_clamped_to_available_chunks() {
        let index = handle(refund_chunks(), 4);

        let results = index
            .search("What is the refund policy?", 4)
            .expect("search should succeed");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "Refunds within 30 days.");
        assert_eq!(results[1].chunk.content, "Contact support for refunds.");
    }

    #[test]
    fn k_is_clamped_to_configured_limit() {
        let mut chunks = refund_chunks();
        chunks.push(stored("Refund forms.", "forms.md", vec![1.0, 0.0, 0.2]));
        let index = handle(chunks, 2);

        let results = index.search("refund", 10).expect("search should succeed");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn repeated_searches_are_deterministic() {
        let index = handle(refund_chunks(), 4);

        let first = index.search("refund", 4).expect("search should succeed");
        let second = index.search("refund", 4).expect("search should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_store_skips_embedding() {
        let embedder = Arc::new(KeywordEmbedder::new());
        let store = VectorStore::from_index_file(IndexFile {
            embeddings_model: "keywords".to_string(),
            chunks: Vec::new(),
        })
        .expect("valid store");
        let index = IndexHandle::new(store, embedder.clone(), 4).expect("valid handle");

        assert!(index.search("refund", 4).expect("search").is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dimension_mismatch_is_a_search_error() {
        let index = handle(vec![stored("short", "a.md", vec![1.0, 0.0])], 4);

        let err = index.search("refund", 4).unwrap_err();
        assert!(matches!(
            err,
            SearchError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn mismatched_embeddings_model_is_rejected() {
        let store = VectorStore::from_index_file(IndexFile {
            embeddings_model: "all-MiniLM-L6-v2".to_string(),
            chunks: Vec::new(),
        })
        .expect("valid store");

        let result = IndexHandle::new(store, Arc::new(KeywordEmbedder::new()), 4);
        assert!(matches!(result, Err(IndexError::ModelMismatch { .. })));
    }

    #[test]
    fn open_fails_for_missing_persist_directory() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = RuntimeConfig {
            embeddings_model_name: "all-minilm".to_string(),
            index_location: dir.path().join("db"),
            model_type: "LlamaCpp".to_string(),
            model_path: dir.path().join("model.gguf"),
            max_output_tokens: 256,
            batch_size: 8,
            retrieved_chunk_count: 4,
            embeddings_host: "http://localhost:11434".to_string(),
            llama_cpp_bin: "llama-cli".to_string(),
            gpt4all_host: "http://localhost:4891".to_string(),
        };

        let err = IndexHandle::open(&config).err().expect("open should fail");
        assert!(matches!(err, IndexError::Missing(_)));
    }
}
