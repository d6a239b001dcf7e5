//! # FAQ RAG - Document Chunking and Similarity Retrieval
//!
//! The retrieval core of a RAG FAQ chatbot: it ingests help-center documents,
//! splits them into overlapping chunks, embeds each chunk and answers
//! similarity queries over the stored vectors. It can be used as a library or
//! served to AI assistants over the Model Context Protocol (MCP).
//!
//! ## Overview
//!
//! Documents arrive as plain text, web pages or text extracted from PDFs.
//! Each one is normalized, split by a recursive separator hierarchy, and
//! every chunk is classified (text, table, title or image-derived) before it
//! is embedded and written to the vector store. A per-document state machine
//! (`pending -> processing -> indexed | failed`) guarantees that a search never
//! sees a half-written document.
//!
//! ## Key Features
//!
//! - **Local Embeddings**: FastEmbed models, or a deterministic hash embedder
//!   for deployments without a model
//! - **Graceful Degradation**: items the model cannot embed get a zero vector
//!   and documents with too many of them are flagged as degraded
//! - **Two Stores**: LanceDB (embedded, default) or an in-memory store
//! - **Atomic Re-indexing**: a failed run removes its partial chunks
//! - **MCP Protocol**: tools for ingestion, search and corpus inspection
//!
//! ## Architecture
//!
//! ```text
//! MCP client / CLI
//!        |
//!   RagMcpServer
//!        |
//!    RagClient ---- DocumentLocks (one run per document)
//!        |
//!   +----+-----------------+--------------------+
//!   |                      |                    |
//! DocumentChunker   EmbeddingGenerator     VectorStore
//! (normalize, split,  (model | hash,       (LanceDB | memory)
//!  classify)           zero fallback)
//! ```
//!
//! ## Modules
//!
//! - [`client`]: High-level client and the indexing pipeline
//! - [`mcp_server`]: MCP protocol server implementation with tools and prompts
//! - [`indexer`]: Decoding, normalization, splitting and classification
//! - [`embedding`]: Embedding providers and the fallback-aware generator
//! - [`vector_db`]: Vector store abstraction and similarity ranking
//! - [`config`]: Configuration management with environment variable support
//! - [`retry`]: Backoff policy for transient store errors
//! - [`types`]: Domain types and MCP request/response types
//! - [`error`]: Error types and classification helpers
//! - [`paths`]: Platform specific data and cache locations
//!
//! ## Usage Example
//!
//! ```no_run
//! use faq_rag::mcp_server::RagMcpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Serve over stdio (MCP protocol) with default configuration
//!     RagMcpServer::serve_stdio().await
//! }
//! ```

/// High-level client and document indexing pipeline
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding providers and batch generation with fallbacks
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Text decoding, normalization, splitting and chunk classification
pub mod indexer;

/// MCP server implementation with tools and prompts
pub mod mcp_server;

/// Platform specific data and cache directories
pub mod paths;

/// Retry with exponential backoff for transient failures
pub mod retry;

/// Domain types and MCP request/response types with JSON schema definitions
pub mod types;

/// Vector store abstraction supporting LanceDB and an in-memory store
pub mod vector_db;

pub use client::RagClient;
pub use config::Config;
pub use types::{
    Chunk, ChunkKind, ChunkMetadata, DeleteDocumentResponse, Document, DocumentRequest,
    DocumentStatus, EmbeddingSource, IndexDocumentRequest, IndexDocumentResponse,
    ReindexDocumentRequest, SearchHit, SearchRequest, SearchResponse, SourceType,
    StatisticsResponse,
};
