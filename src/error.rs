//! Error types for faq-rag
//!
//! Each pipeline stage has its own `thiserror` enum; [`RagError`] wraps them
//! for APIs that return a typed error. Most of the crate returns
//! `anyhow::Result` and the helpers at the bottom look through error chains.
use thiserror::Error;

/// Any error the crate produces with a concrete type
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Indexing error: {0}")]
    Indexing(#[from] IndexingError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),

    #[error("Embedding batch is empty")]
    EmptyBatch,

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors related to vector store operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to connect to vector database: {0}")]
    ConnectionFailed(String),

    #[error("Vector database operation timed out: {0}")]
    Timeout(String),

    #[error("Failed to store chunks: {0}")]
    StoreFailed(String),

    #[error("Failed to search embeddings: {0}")]
    SearchFailed(String),

    #[error("Failed to delete chunks: {0}")]
    DeleteFailed(String),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("Duplicate chunk {document_id}:{chunk_index}")]
    DuplicateChunk {
        document_id: String,
        chunk_index: usize,
    },

    #[error("Database is not initialized")]
    NotInitialized,
}

/// Errors related to document ingestion and the indexing pipeline
#[derive(Error, Debug)]
pub enum IndexingError {
    #[error("Document content is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("Failed to extract text from {source_type} source: {reason}")]
    ExtractionFailed { source_type: String, reason: String },

    #[error("Document '{0}' is empty after normalization")]
    EmptyDocument(String),

    #[error("Document is too large: {size} bytes (max {max})")]
    DocumentTooLarge { size: usize, max: usize },

    #[error("Invalid status transition for document '{document_id}': {from} -> {to}")]
    InvalidTransition {
        document_id: String,
        from: String,
        to: String,
    },

    #[error("Indexing was cancelled")]
    Cancelled,
}

/// Errors related to text chunking
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),

    #[error("Chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidOverlap { overlap: usize, chunk_size: usize },

    #[error("No chunks generated from document: {0}")]
    NoChunksGenerated(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Embedding configuration {configured} does not match the indexed corpus {stored}")]
    EmbeddingMismatch { configured: String, stored: String },
}

impl RagError {
    /// Whether a later attempt of the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::VectorDb(err) => err.is_transient(),
            RagError::Embedding(EmbeddingError::Timeout(_)) => true,
            RagError::Io(_) => true,
            _ => false,
        }
    }
}

impl VectorDbError {
    /// Connection drops and timeouts may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VectorDbError::ConnectionFailed(_) | VectorDbError::Timeout(_)
        )
    }
}

/// Check whether an anyhow error chain carries a transient storage failure
pub fn is_transient_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(db_err) = cause.downcast_ref::<VectorDbError>() {
            return db_err.is_transient();
        }
        if let Some(rag_err) = cause.downcast_ref::<RagError>() {
            return rag_err.is_retryable();
        }
        cause.downcast_ref::<std::io::Error>().is_some()
    })
}

/// Find a dimension mismatch anywhere in an anyhow error chain
pub fn find_dimension_mismatch(err: &anyhow::Error) -> Option<(usize, usize)> {
    err.chain().find_map(|cause| match cause.downcast_ref::<EmbeddingError>() {
        Some(EmbeddingError::DimensionMismatch { expected, actual }) => Some((*expected, *actual)),
        _ => None,
    })
}
