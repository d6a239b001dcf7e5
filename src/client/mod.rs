//! Core library client for faq-rag
//!
//! This module provides the main client interface for using faq-rag
//! as a library in your own Rust applications.

use crate::config::Config;
use crate::embedding::{EmbeddingGenerator, EmbeddingSignature};
use crate::error::VectorDbError;
use crate::indexer::DocumentChunker;
use crate::retry::RetryPolicy;
use crate::types::*;
use crate::vector_db::{LanceVectorStore, MemoryVectorStore, VectorStore};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use index_lock::DocumentLocks;
use indexing::{IndexJob, SourceContent};

/// Main client for interacting with the RAG system
///
/// This client provides a high-level API for indexing documents and running
/// similarity searches over them. It contains all the core functionality and
/// can be used directly as a library or wrapped by the MCP server.
///
/// # Example
///
/// ```no_run
/// use faq_rag::{IndexDocumentRequest, RagClient, SearchRequest, SourceType};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     // Create client with default configuration
///     let client = RagClient::new().await?;
///
///     let response = client
///         .index_document(IndexDocumentRequest {
///             document_id: "shipping".to_string(),
///             title: Some("Shipping".to_string()),
///             content: "Orders ship within 2 business days.".to_string(),
///             source_type: SourceType::PlainText,
///             force: false,
///         })
///         .await?;
///     println!("Indexed {} chunks", response.chunks_created);
///
///     let hits = client
///         .search(SearchRequest {
///             query: "how fast do orders ship".to_string(),
///             limit: 3,
///             threshold: None,
///         })
///         .await?;
///     for hit in hits.results {
///         println!("{:.3} {}", hit.score, hit.content);
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RagClient {
    pub(crate) store: Arc<dyn VectorStore>,
    pub(crate) embedder: Arc<EmbeddingGenerator>,
    pub(crate) chunker: Arc<DocumentChunker>,
    pub(crate) retry: RetryPolicy,
    // Configuration (for accessing batch sizes, ratios, etc.)
    pub(crate) config: Arc<Config>,
    // Documents with an indexing run in progress
    pub(crate) locks: DocumentLocks,
}

impl RagClient {
    /// Create a new RAG client with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration cannot be loaded
    /// - Embedding provider cannot be initialized
    /// - Vector store cannot be opened or holds a corpus with another signature
    pub async fn new() -> Result<Self> {
        let config = Config::new().context("Failed to load configuration")?;
        Self::with_config(config).await
    }

    /// Create a new RAG client with custom configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use faq_rag::{Config, RagClient};
    /// use faq_rag::config::EmbeddingStrategy;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut config = Config::default();
    ///     config.embedding.strategy = EmbeddingStrategy::Hash;
    ///     config.vector_db.backend = "memory".to_string();
    ///
    ///     let client = RagClient::with_config(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn with_config(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing RAG client with configuration");
        tracing::debug!("Vector DB backend: {}", config.vector_db.backend);
        tracing::debug!("Embedding strategy: {:?}", config.embedding.strategy);
        tracing::debug!(
            "Chunk size: {} (overlap {})",
            config.indexing.chunk_size,
            config.indexing.chunk_overlap
        );

        let embedder = Arc::new(
            EmbeddingGenerator::from_config(&config.embedding)
                .context("Failed to initialize embedding provider")?,
        );

        let store: Arc<dyn VectorStore> = match config.vector_db.backend.as_str() {
            "memory" => {
                tracing::info!("Using in-memory vector store");
                Arc::new(MemoryVectorStore::new())
            }
            _ => {
                tracing::info!(
                    "Using LanceDB vector store at {}",
                    config.vector_db.lancedb_path.display()
                );
                Arc::new(
                    LanceVectorStore::with_path(&config.vector_db.lancedb_path.to_string_lossy())
                        .await
                        .context("Failed to initialize LanceDB vector store")?,
                )
            }
        };

        Self::with_components(config, store, embedder).await
    }

    /// Assemble a client from an already built store and embedder
    ///
    /// The store is bound to the embedder's signature; a corpus built with a
    /// different strategy, model or dimension is rejected.
    pub async fn with_components(
        config: Config,
        store: Arc<dyn VectorStore>,
        embedder: Arc<EmbeddingGenerator>,
    ) -> Result<Self> {
        let chunker = DocumentChunker::new(config.indexing.chunk_size, config.indexing.chunk_overlap)
            .context("Invalid chunking configuration")?;

        store
            .initialize(&embedder.signature())
            .await
            .context("Failed to initialize vector store")?;

        Ok(Self {
            store,
            embedder,
            chunker: Arc::new(chunker),
            retry: config.retry.policy(),
            config: Arc::new(config),
            locks: DocumentLocks::new(),
        })
    }

    /// Ingest a document given as text
    ///
    /// Pipeline failures (bad input, exhausted store retries) do not return
    /// `Err`; the document is marked `failed` and the response carries the
    /// reason. Only invalid requests and lock errors are returned as errors.
    pub async fn index_document(&self, request: IndexDocumentRequest) -> Result<IndexDocumentResponse> {
        self.index_document_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// [`index_document`](Self::index_document) with a cancellation token
    /// checked between stages and write batches
    pub async fn index_document_with_cancellation(
        &self,
        request: IndexDocumentRequest,
        cancel_token: CancellationToken,
    ) -> Result<IndexDocumentResponse> {
        request.validate().map_err(|e| anyhow::anyhow!(e))?;

        let job = IndexJob {
            document_id: request.document_id,
            title: request.title,
            source_type: request.source_type,
            content: SourceContent::Text(request.content),
            force: request.force,
        };
        indexing::do_index_document(self, job, cancel_token).await
    }

    /// Ingest a document given as raw bytes (UTF-8 text, HTML or PDF)
    pub async fn index_document_bytes(
        &self,
        document_id: &str,
        title: Option<String>,
        bytes: Vec<u8>,
        source_type: SourceType,
        force: bool,
    ) -> Result<IndexDocumentResponse> {
        DocumentRequest {
            document_id: document_id.to_string(),
        }
        .validate()
        .map_err(|e| anyhow::anyhow!(e))?;

        let job = IndexJob {
            document_id: document_id.to_string(),
            title,
            source_type,
            content: SourceContent::Bytes(bytes),
            force,
        };
        indexing::do_index_document(self, job, CancellationToken::new()).await
    }

    /// Rebuild an existing document's chunks from scratch
    ///
    /// Uses the replacement content when given, otherwise the stored
    /// normalized content. Always rewrites, even if nothing changed.
    pub async fn reindex_document(&self, request: ReindexDocumentRequest) -> Result<IndexDocumentResponse> {
        request.validate().map_err(|e| anyhow::anyhow!(e))?;

        let existing = self
            .store
            .get_document(&request.document_id)
            .await
            .context("Failed to load document")?
            .ok_or_else(|| VectorDbError::DocumentNotFound(request.document_id.clone()))?;

        let content = match request.content {
            Some(content) => SourceContent::Text(content),
            None => SourceContent::Normalized(existing.content),
        };

        let job = IndexJob {
            document_id: request.document_id,
            title: Some(existing.title),
            source_type: existing.source_type,
            content,
            force: true,
        };
        indexing::do_index_document(self, job, CancellationToken::new()).await
    }

    /// Delete a document and all of its chunks
    pub async fn delete_document(&self, request: DocumentRequest) -> Result<DeleteDocumentResponse> {
        request.validate().map_err(|e| anyhow::anyhow!(e))?;

        // Deleting mid-run would race the writer
        if self.locks.is_locked(&request.document_id) {
            tracing::info!(
                "Waiting for the indexing run on '{}' before deleting",
                request.document_id
            );
        }
        let guard = self.locks.acquire(&request.document_id).await?;

        let chunks_removed = self
            .store
            .count_chunks(&request.document_id)
            .await
            .context("Failed to count chunks")?;
        let deleted = self
            .retry
            .run_transient("delete document", || {
                self.store.delete_document(&request.document_id)
            })
            .await
            .context("Failed to delete document")?;

        guard.release(None);

        tracing::info!(
            "Deleted document '{}' ({} chunks)",
            request.document_id,
            chunks_removed
        );

        Ok(DeleteDocumentResponse {
            document_id: request.document_id,
            deleted,
            chunks_removed,
        })
    }

    pub async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        self.store
            .get_document(document_id)
            .await
            .context("Failed to load document")
    }

    /// All documents ordered by id
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.store
            .list_documents()
            .await
            .context("Failed to list documents")
    }

    /// Chunks of a document in index order
    pub async fn get_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        self.store
            .chunks_for_document(document_id)
            .await
            .context("Failed to load chunks")
    }

    /// Find the chunks most similar to a query
    ///
    /// The request threshold wins over `search.default_threshold`. Errors
    /// (embedding failure, dimension mismatch, store failure) are returned
    /// rather than turned into an empty result.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        request.validate().map_err(|e| anyhow::anyhow!(e))?;

        let start = Instant::now();

        let query_embedding = self
            .embedder
            .embed(&request.query)
            .await
            .context("Failed to generate query embedding")?;

        let threshold = request.threshold.or(self.config.search.default_threshold);

        let results = self
            .store
            .nearest_neighbors(&query_embedding.vector, request.limit, threshold)
            .await
            .context("Failed to search")?;

        tracing::debug!(
            "Search returned {} results for a {} character query",
            results.len(),
            request.query.chars().count()
        );

        Ok(SearchResponse {
            results: results.into_iter().map(SearchHit::from).collect(),
            embedding_source: query_embedding.source,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Get statistics about the indexed corpus
    pub async fn get_statistics(&self) -> Result<StatisticsResponse> {
        let stats = self
            .store
            .get_statistics()
            .await
            .context("Failed to get statistics")?;

        Ok(StatisticsResponse {
            total_documents: stats.total_documents,
            total_chunks: stats.total_chunks,
            status_breakdown: stats.status_breakdown,
            kind_breakdown: stats.kind_breakdown,
            embedding_signature: stats.signature.map(|s| s.to_string()),
        })
    }

    /// Clear all documents and chunks, then rebind the store to this client's signature
    ///
    /// Runs already in progress finish (or roll back) first; runs started
    /// meanwhile wait until the store is cleared.
    pub async fn clear_index(&self) -> Result<ClearResponse> {
        let _exclusive = self.locks.exclusive().await;

        match self.store.clear().await {
            Ok(_) => {
                if let Err(e) = self.store.initialize(&self.embedder.signature()).await {
                    Ok(ClearResponse {
                        success: false,
                        message: format!("Cleared but failed to reinitialize: {}", e),
                    })
                } else {
                    Ok(ClearResponse {
                        success: true,
                        message: "Successfully cleared all indexed documents".to_string(),
                    })
                }
            }
            Err(e) => Ok(ClearResponse {
                success: false,
                message: format!("Failed to clear index: {}", e),
            }),
        }
    }

    /// Get the configuration used by this client
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the embedding dimension used by this client
    pub fn embedding_dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Signature every vector in this client's corpus shares
    pub fn embedding_signature(&self) -> EmbeddingSignature {
        self.embedder.signature()
    }
}

// Per-document run locking
pub(crate) mod index_lock;
// Indexing pipeline
pub(crate) mod indexing;
