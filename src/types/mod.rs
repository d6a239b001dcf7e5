use crate::error::IndexingError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length of a document identifier
pub const MAX_DOCUMENT_ID_LEN: usize = 256;

/// Maximum number of search results a single request may ask for
pub const MAX_SEARCH_LIMIT: usize = 100;

/// Where a document's raw content came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Plain UTF-8 text
    #[default]
    PlainText,
    /// Text extracted from a structured binary file (PDF)
    StructuredBinaryExtract,
    /// An HTML page
    WebPage,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::PlainText => "plain_text",
            SourceType::StructuredBinaryExtract => "structured_binary_extract",
            SourceType::WebPage => "web_page",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "plain_text" | "text" | "txt" => Ok(SourceType::PlainText),
            "structured_binary_extract" | "pdf" => Ok(SourceType::StructuredBinaryExtract),
            "web_page" | "html" => Ok(SourceType::WebPage),
            other => Err(format!("unknown source type '{}'", other)),
        }
    }
}

/// Lifecycle state of a document in the indexing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Pending,
    Processing,
    Indexed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Whether the state machine allows moving from `self` to `next`
    ///
    /// `pending -> processing -> {indexed | failed}`, and both terminal
    /// states may go back to `processing` for a full re-index.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Indexed)
                | (Processing, Failed)
                | (Indexed, Processing)
                | (Failed, Processing)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DocumentStatus::Pending),
            "processing" => Ok(DocumentStatus::Processing),
            "indexed" => Ok(DocumentStatus::Indexed),
            "failed" => Ok(DocumentStatus::Failed),
            other => Err(format!("unknown document status '{}'", other)),
        }
    }
}

/// A logical unit of ingested content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    /// Unique identifier supplied by the ingestion trigger
    pub id: String,
    pub title: String,
    /// Normalized text content
    pub content: String,
    pub source_type: SourceType,
    pub status: DocumentStatus,
    /// Number of persisted chunks (authoritative once `indexed`)
    pub chunk_count: usize,
    /// SHA256 of the normalized content
    pub content_hash: String,
    /// Set when too many chunks were embedded without the model
    #[serde(default)]
    pub degraded: bool,
    /// Reason for the last failure, if any
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Unix timestamp (seconds)
    pub created_at: i64,
    /// Unix timestamp (seconds)
    pub updated_at: i64,
}

impl Document {
    /// Create a new pending document
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        let content = content.into();
        Self {
            id: id.into(),
            title: title.into(),
            content_hash: content_hash(&content),
            content,
            source_type,
            status: DocumentStatus::Pending,
            chunk_count: 0,
            degraded: false,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, rejecting transitions the state machine does not allow
    pub fn transition_to(&mut self, next: DocumentStatus) -> Result<(), IndexingError> {
        if !self.status.can_transition_to(next) {
            return Err(IndexingError::InvalidTransition {
                document_id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = chrono::Utc::now().timestamp();
        Ok(())
    }

    /// Transition to `indexed` with the final chunk count
    pub fn mark_indexed(&mut self, chunk_count: usize, degraded: bool) -> Result<(), IndexingError> {
        self.transition_to(DocumentStatus::Indexed)?;
        self.chunk_count = chunk_count;
        self.degraded = degraded;
        self.failure_reason = None;
        Ok(())
    }

    /// Transition to `failed`; a failed document owns no chunks
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), IndexingError> {
        self.transition_to(DocumentStatus::Failed)?;
        self.chunk_count = 0;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Replace the content, recomputing the hash
    pub fn set_content(&mut self, content: String) {
        self.content_hash = content_hash(&content);
        self.content = content;
    }
}

/// SHA256 hex digest used to detect unchanged content
pub fn content_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Classification tag of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    #[default]
    Text,
    Table,
    Title,
    ImageDerived,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Text => "text",
            ChunkKind::Table => "table",
            ChunkKind::Title => "title",
            ChunkKind::ImageDerived => "image_derived",
        }
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChunkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ChunkKind::Text),
            "table" => Ok(ChunkKind::Table),
            "title" => Ok(ChunkKind::Title),
            "image_derived" => Ok(ChunkKind::ImageDerived),
            other => Err(format!("unknown chunk kind '{}'", other)),
        }
    }
}

/// Which strategy produced an embedding vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingSource {
    /// Real embedding model output
    Model,
    /// Deterministic hash-based pseudo-embedding
    Hash,
    /// Zero vector substituted for an item that could not be embedded
    Zero,
}

impl EmbeddingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingSource::Model => "model",
            EmbeddingSource::Hash => "hash",
            EmbeddingSource::Zero => "zero",
        }
    }

    /// True for vectors that carry no real model semantics
    pub fn is_fallback(&self) -> bool {
        !matches!(self, EmbeddingSource::Model)
    }
}

impl fmt::Display for EmbeddingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "model" => Ok(EmbeddingSource::Model),
            "hash" => Ok(EmbeddingSource::Hash),
            "zero" => Ok(EmbeddingSource::Zero),
            other => Err(format!("unknown embedding source '{}'", other)),
        }
    }
}

/// Metadata stored with each chunk
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ChunkMetadata {
    /// Classification of the chunk content
    pub kind: ChunkKind,
    /// Character offset of the chunk start in the normalized document (best effort)
    pub start_offset: usize,
    /// Character offset one past the chunk end (best effort)
    pub end_offset: usize,
    /// Source type of the owning document
    pub source_type: SourceType,
    /// Open extension map for caller-defined attributes
    #[serde(default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A contiguous slice of a document's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: String,
    /// Zero-based position within the document
    pub chunk_index: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Embedding vector, absent until the embedding stage has run
    pub embedding: Option<Vec<f32>>,
    pub embedding_source: Option<EmbeddingSource>,
}

impl Chunk {
    /// Stable identifier `{document_id}:{chunk_index}`
    pub fn id(&self) -> String {
        chunk_id(&self.document_id, self.chunk_index)
    }
}

pub fn chunk_id(document_id: &str, chunk_index: usize) -> String {
    format!("{}:{}", document_id, chunk_index)
}

/// A stored chunk together with its similarity to a query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

fn validate_document_id(document_id: &str) -> Result<(), String> {
    if document_id.trim().is_empty() {
        return Err("document_id cannot be empty".to_string());
    }
    if document_id.len() > MAX_DOCUMENT_ID_LEN {
        return Err(format!(
            "document_id too long: {} characters (max {})",
            document_id.len(),
            MAX_DOCUMENT_ID_LEN
        ));
    }
    if document_id.chars().any(|c| c.is_control()) {
        return Err("document_id cannot contain control characters".to_string());
    }
    Ok(())
}

/// Request to ingest (or re-ingest) a document
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexDocumentRequest {
    /// Unique document identifier
    pub document_id: String,
    /// Optional human readable title (defaults to the document id)
    #[serde(default)]
    pub title: Option<String>,
    /// Raw document text
    pub content: String,
    /// Source type of the content (default: plain_text)
    #[serde(default)]
    pub source_type: SourceType,
    /// Re-index even when the content is unchanged
    #[serde(default)]
    pub force: bool,
}

impl IndexDocumentRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_document_id(&self.document_id)
    }
}

/// Outcome of an indexing run
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexDocumentResponse {
    pub document_id: String,
    /// Final status of the document
    pub status: DocumentStatus,
    /// Number of chunks written
    pub chunks_created: usize,
    /// Number of embeddings generated (including fallbacks)
    pub embeddings_generated: usize,
    /// Number of chunks that got a substitute zero vector
    pub fallback_count: usize,
    /// Whether the fallback share exceeded the configured ratio
    pub degraded: bool,
    /// True when the content was unchanged and nothing was rewritten
    #[serde(default)]
    pub skipped: bool,
    /// Time taken in milliseconds
    pub duration_ms: u64,
    /// Failure reason when status is `failed`
    #[serde(default)]
    pub error: Option<String>,
}

impl IndexDocumentResponse {
    pub(crate) fn failed(document_id: &str, reason: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            document_id: document_id.to_string(),
            status: DocumentStatus::Failed,
            chunks_created: 0,
            embeddings_generated: 0,
            fallback_count: 0,
            degraded: false,
            skipped: false,
            duration_ms,
            error: Some(reason.into()),
        }
    }
}

/// Request to re-index an existing document
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReindexDocumentRequest {
    pub document_id: String,
    /// Replacement content; the stored content is re-chunked when absent
    #[serde(default)]
    pub content: Option<String>,
}

impl ReindexDocumentRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_document_id(&self.document_id)
    }
}

/// Request addressing a single document
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentRequest {
    pub document_id: String,
}

impl DocumentRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_document_id(&self.document_id)
    }
}

/// Response from deleting a document
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteDocumentResponse {
    pub document_id: String,
    /// Whether the document existed
    pub deleted: bool,
    /// Number of chunks removed with it
    pub chunks_removed: usize,
}

/// Similarity search request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchRequest {
    /// The question or search query
    pub query: String,
    /// Number of results to return (default: 5)
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Minimum cosine similarity; results below it are dropped
    #[serde(default)]
    pub threshold: Option<f32>,
}

pub(crate) fn default_limit() -> usize {
    5
}

impl SearchRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.query.trim().is_empty() {
            return Err("query cannot be empty".to_string());
        }
        if self.limit == 0 {
            return Err("limit must be greater than 0".to_string());
        }
        if self.limit > MAX_SEARCH_LIMIT {
            return Err(format!(
                "limit too large: {} (max {})",
                self.limit, MAX_SEARCH_LIMIT
            ));
        }
        if let Some(threshold) = self.threshold
            && !(-1.0..=1.0).contains(&threshold)
        {
            return Err(format!(
                "threshold must be between -1.0 and 1.0, got {}",
                threshold
            ));
        }
        Ok(())
    }
}

/// A single search hit
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    /// `{document_id}:{chunk_index}`
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub content: String,
    /// Cosine similarity to the query
    pub score: f32,
    pub metadata: ChunkMetadata,
}

impl From<ScoredChunk> for SearchHit {
    fn from(scored: ScoredChunk) -> Self {
        let chunk = scored.chunk;
        Self {
            chunk_id: chunk.id(),
            document_id: chunk.document_id,
            chunk_index: chunk.chunk_index,
            content: chunk.content,
            score: scored.score,
            metadata: chunk.metadata,
        }
    }
}

/// Response from a similarity search
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchResponse {
    /// Hits ordered by descending score
    pub results: Vec<SearchHit>,
    /// Strategy that produced the query vector
    pub embedding_source: EmbeddingSource,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Request to get statistics about the index
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatisticsRequest {}

/// Statistics about the indexed corpus
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatisticsResponse {
    pub total_documents: usize,
    pub total_chunks: usize,
    /// Documents per status
    pub status_breakdown: Vec<(String, usize)>,
    /// Chunks per classification
    pub kind_breakdown: Vec<(String, usize)>,
    /// Corpus embedding signature, if the store has one
    pub embedding_signature: Option<String>,
}

/// Request to clear the index
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearRequest {}

/// Response from clear operation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearResponse {
    /// Whether the operation was successful
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests;
