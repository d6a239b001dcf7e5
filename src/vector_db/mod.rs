// LanceDB is the default embedded vector store
pub mod lance_client;
pub use lance_client::LanceVectorStore;

// In-process store for tests and ephemeral deployments
mod memory_store;
pub use memory_store::MemoryVectorStore;

pub mod similarity;
pub use similarity::{check_dimension, cosine_similarity, rank_top_k};

pub use crate::embedding::EmbeddingSignature;

use crate::error::ConfigError;
use crate::types::{Chunk, Document, ScoredChunk};
use anyhow::Result;

/// Persistent storage for documents and their embedded chunks
///
/// Chunks are keyed by `(document_id, chunk_index)`. A store holds a single
/// corpus whose vectors all share one [`EmbeddingSignature`].
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Create tables if needed and bind the store to `signature`
    ///
    /// Fails with [`ConfigError::EmbeddingMismatch`] when the existing corpus
    /// was built with a different signature.
    async fn initialize(&self, signature: &EmbeddingSignature) -> Result<()>;

    /// Signature of the stored corpus, if one has been recorded
    async fn signature(&self) -> Result<Option<EmbeddingSignature>>;

    /// Insert or replace a document record
    async fn upsert_document(&self, document: &Document) -> Result<()>;

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>>;

    /// All documents ordered by id
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete a document together with any chunks it still owns
    async fn delete_document(&self, document_id: &str) -> Result<bool>;

    /// Persist embedded chunks; every chunk needs an embedding of the corpus
    /// dimension and a `(document_id, chunk_index)` not already stored
    async fn bulk_insert_chunks(&self, chunks: Vec<Chunk>) -> Result<usize>;

    /// Remove every chunk of a document, returning how many were removed
    async fn delete_chunks_by_document(&self, document_id: &str) -> Result<usize>;

    async fn count_chunks(&self, document_id: &str) -> Result<usize>;

    /// A document's chunks ordered by chunk index
    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>>;

    /// The `k` chunks most similar to `query`, best first
    async fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>>;

    async fn get_statistics(&self) -> Result<DatabaseStats>;

    /// Drop all documents, chunks and the recorded signature
    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    pub total_documents: usize,
    pub total_chunks: usize,
    pub status_breakdown: Vec<(String, usize)>,
    pub kind_breakdown: Vec<(String, usize)>,
    pub signature: Option<EmbeddingSignature>,
}

/// Compare a configured signature with the one a corpus was built with
pub(crate) fn ensure_signature_matches(
    stored: &EmbeddingSignature,
    configured: &EmbeddingSignature,
) -> Result<(), ConfigError> {
    if stored != configured {
        return Err(ConfigError::EmbeddingMismatch {
            configured: configured.to_string(),
            stored: stored.to_string(),
        });
    }
    Ok(())
}

/// Sort a count map into a breakdown, largest first then by name
pub(crate) fn into_breakdown(counts: std::collections::HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut breakdown: Vec<(String, usize)> = counts.into_iter().collect();
    breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    breakdown
}
