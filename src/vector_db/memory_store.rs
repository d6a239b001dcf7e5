use super::{
    DatabaseStats, EmbeddingSignature, VectorStore, check_dimension, cosine_similarity,
    ensure_signature_matches, into_breakdown, rank_top_k,
};
use crate::error::VectorDbError;
use crate::types::{Chunk, Document, DocumentStatus, ScoredChunk};
use anyhow::Result;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    signature: Option<EmbeddingSignature>,
    documents: BTreeMap<String, Document>,
    /// Chunks in insertion order
    chunks: Vec<Chunk>,
}

/// Vector store held entirely in process memory
///
/// Search is a brute-force cosine scan over every stored chunk. Nothing
/// survives the process; use it for tests and throwaway corpora.
#[derive(Default)]
pub struct MemoryVectorStore {
    inner: RwLock<Inner>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| anyhow::anyhow!("Failed to acquire store read lock: {}", e))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire store write lock: {}", e))
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryVectorStore {
    async fn initialize(&self, signature: &EmbeddingSignature) -> Result<()> {
        let mut inner = self.write()?;
        if let Some(stored) = inner.signature.as_ref() {
            ensure_signature_matches(stored, signature)?;
            return Ok(());
        }
        inner.signature = Some(signature.clone());
        Ok(())
    }

    async fn signature(&self) -> Result<Option<EmbeddingSignature>> {
        Ok(self.read()?.signature.clone())
    }

    async fn upsert_document(&self, document: &Document) -> Result<()> {
        self.write()?
            .documents
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        Ok(self.read()?.documents.get(document_id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        Ok(self.read()?.documents.values().cloned().collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool> {
        let mut inner = self.write()?;
        inner.chunks.retain(|c| c.document_id != document_id);
        Ok(inner.documents.remove(document_id).is_some())
    }

    async fn bulk_insert_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let mut inner = self.write()?;
        let dimension = inner
            .signature
            .as_ref()
            .map(|s| s.dimension)
            .ok_or(VectorDbError::NotInitialized)?;

        let mut seen: HashSet<(String, usize)> = inner
            .chunks
            .iter()
            .map(|c| (c.document_id.clone(), c.chunk_index))
            .collect();

        // Validate the whole batch before touching the store
        for chunk in &chunks {
            let embedding = chunk.embedding.as_ref().ok_or_else(|| {
                VectorDbError::StoreFailed(format!("chunk {} has no embedding", chunk.id()))
            })?;
            check_dimension(dimension, embedding.len())?;

            if !seen.insert((chunk.document_id.clone(), chunk.chunk_index)) {
                return Err(VectorDbError::DuplicateChunk {
                    document_id: chunk.document_id.clone(),
                    chunk_index: chunk.chunk_index,
                }
                .into());
            }
        }

        let count = chunks.len();
        inner.chunks.extend(chunks);
        Ok(count)
    }

    async fn delete_chunks_by_document(&self, document_id: &str) -> Result<usize> {
        let mut inner = self.write()?;
        let before = inner.chunks.len();
        inner.chunks.retain(|c| c.document_id != document_id);
        Ok(before - inner.chunks.len())
    }

    async fn count_chunks(&self, document_id: &str) -> Result<usize> {
        Ok(self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .count())
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .read()?
            .chunks
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks)
    }

    async fn nearest_neighbors(
        &self,
        query: &[f32],
        k: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        let inner = self.read()?;
        let dimension = inner
            .signature
            .as_ref()
            .map(|s| s.dimension)
            .ok_or(VectorDbError::NotInitialized)?;
        check_dimension(dimension, query.len())?;

        // Chunks of documents mid-run or failed stay out of results
        let hidden: HashSet<&str> = inner
            .documents
            .values()
            .filter(|d| d.status != DocumentStatus::Indexed)
            .map(|d| d.id.as_str())
            .collect();

        let candidates: Vec<ScoredChunk> = inner
            .chunks
            .par_iter()
            .filter(|chunk| !hidden.contains(chunk.document_id.as_str()))
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_ref()?;
                Some(ScoredChunk {
                    score: cosine_similarity(query, embedding),
                    chunk: chunk.clone(),
                })
            })
            .collect();

        Ok(rank_top_k(candidates, k, threshold))
    }

    async fn get_statistics(&self) -> Result<DatabaseStats> {
        let inner = self.read()?;

        let mut status_counts: HashMap<String, usize> = HashMap::new();
        for document in inner.documents.values() {
            *status_counts.entry(document.status.to_string()).or_insert(0) += 1;
        }

        let mut kind_counts: HashMap<String, usize> = HashMap::new();
        for chunk in &inner.chunks {
            *kind_counts
                .entry(chunk.metadata.kind.to_string())
                .or_insert(0) += 1;
        }

        Ok(DatabaseStats {
            total_documents: inner.documents.len(),
            total_chunks: inner.chunks.len(),
            status_breakdown: into_breakdown(status_counts),
            kind_breakdown: into_breakdown(kind_counts),
            signature: inner.signature.clone(),
        })
    }

    async fn clear(&self) -> Result<()> {
        *self.write()? = Inner::default();
        Ok(())
    }
}
