//! LanceDB vector store
//!
//! Two tables live in the database directory: `documents` with one row per
//! document and `chunks` with one row per chunk and a fixed-size vector
//! column. The corpus signature is kept beside them in
//! `corpus_signature.json` so a reopened store can refuse foreign vectors.

use super::{
    DatabaseStats, EmbeddingSignature, VectorStore, check_dimension, ensure_signature_matches,
    into_breakdown, rank_top_k,
};
use crate::error::VectorDbError;
use crate::types::{Chunk, ChunkMetadata, Document, DocumentStatus, ScoredChunk};
use anyhow::{Context, Result};
use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, Int64Array, RecordBatch,
    RecordBatchIterator, StringArray, UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::DistanceType;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

const DOCUMENTS_TABLE: &str = "documents";
const CHUNKS_TABLE: &str = "chunks";
const SIGNATURE_FILE: &str = "corpus_signature.json";

/// LanceDB vector store implementation (embedded, no server required)
pub struct LanceVectorStore {
    connection: Connection,
    db_path: PathBuf,
    /// Signature bound by `initialize`
    signature: RwLock<Option<EmbeddingSignature>>,
}

impl LanceVectorStore {
    /// Create a new store at the default path
    pub async fn new() -> Result<Self> {
        let db_path = Self::default_lancedb_path();
        Self::with_path(&db_path).await
    }

    /// Create a new store at a custom path
    pub async fn with_path(db_path: &str) -> Result<Self> {
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(db_path)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(e.to_string()))
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            connection,
            db_path: PathBuf::from(db_path),
            signature: RwLock::new(None),
        })
    }

    /// Default database location under the platform data directory
    pub fn default_lancedb_path() -> String {
        crate::paths::PlatformPaths::default_lancedb_path()
            .to_string_lossy()
            .to_string()
    }

    fn signature_path(&self) -> PathBuf {
        self.db_path.join(SIGNATURE_FILE)
    }

    fn read_signature_file(&self) -> Result<Option<EmbeddingSignature>> {
        let path = self.signature_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let signature = serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt corpus signature in {}", path.display()))?;
        Ok(Some(signature))
    }

    fn write_signature_file(&self, signature: &EmbeddingSignature) -> Result<()> {
        std::fs::create_dir_all(&self.db_path)
            .with_context(|| format!("Failed to create {}", self.db_path.display()))?;
        let json = serde_json::to_string_pretty(signature)?;
        std::fs::write(self.signature_path(), json).context("Failed to write corpus signature")
    }

    fn bound_dimension(&self) -> Result<usize> {
        let guard = self
            .signature
            .read()
            .map_err(|e| anyhow::anyhow!("Failed to acquire signature lock: {}", e))?;
        guard
            .as_ref()
            .map(|s| s.dimension)
            .ok_or_else(|| VectorDbError::NotInitialized.into())
    }

    fn documents_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("source_type", DataType::Utf8, false),
            Field::new("status", DataType::Utf8, false),
            Field::new("chunk_count", DataType::UInt32, false),
            Field::new("content_hash", DataType::Utf8, false),
            Field::new("degraded", DataType::Boolean, false),
            Field::new("failure_reason", DataType::Utf8, true),
            Field::new("created_at", DataType::Int64, false),
            Field::new("updated_at", DataType::Int64, false),
        ]))
    }

    fn chunks_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("start_offset", DataType::UInt32, false),
            Field::new("end_offset", DataType::UInt32, false),
            Field::new("source_type", DataType::Utf8, false),
            Field::new("extra", DataType::Utf8, false),
            Field::new("embedding_source", DataType::Utf8, false),
            Field::new("inserted_seq", DataType::Int64, false),
        ]))
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;
        Ok(table_names.iter().any(|t| t == name))
    }

    async fn ensure_table(&self, name: &str, schema: Arc<Schema>) -> Result<()> {
        if self.table_exists(name).await? {
            return Ok(());
        }

        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

        self.connection
            .create_table(name, Box::new(batches))
            .execute()
            .await
            .with_context(|| format!("Failed to create table '{}'", name))?;

        tracing::info!("Created table '{}'", name);
        Ok(())
    }

    async fn open(&self, name: &str) -> Result<Table> {
        self.connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| db_error(e, VectorDbError::ConnectionFailed))
            .with_context(|| format!("Failed to open table '{}'", name))
    }

    async fn query_batches(
        &self,
        table_name: &str,
        filter: Option<String>,
        columns: Option<Vec<String>>,
    ) -> Result<Vec<RecordBatch>> {
        let table = self.open(table_name).await?;
        let mut query = table.query();
        if let Some(filter) = filter {
            query = query.only_if(filter);
        }
        if let Some(columns) = columns {
            query = query.select(Select::Columns(columns));
        }

        let stream = query
            .execute()
            .await
            .map_err(|e| db_error(e, VectorDbError::SearchFailed))?;
        stream
            .try_collect::<Vec<RecordBatch>>()
            .await
            .context("Failed to collect query results")
    }

    async fn query_chunks(&self, filter: Option<String>) -> Result<Vec<(Chunk, i64)>> {
        let batches = self.query_batches(CHUNKS_TABLE, filter, None).await?;
        let mut rows = Vec::new();
        for batch in &batches {
            rows.extend(chunks_from_batch(batch)?);
        }
        Ok(rows)
    }

    async fn query_documents(&self, filter: Option<String>) -> Result<Vec<Document>> {
        let batches = self.query_batches(DOCUMENTS_TABLE, filter, None).await?;
        let mut documents = Vec::new();
        for batch in &batches {
            documents.extend(documents_from_batch(batch)?);
        }
        Ok(documents)
    }

    async fn add_batch(&self, table_name: &str, batch: RecordBatch) -> Result<()> {
        let table = self.open(table_name).await?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| db_error(e, VectorDbError::StoreFailed))
            .with_context(|| format!("Failed to add records to '{}'", table_name))?;
        Ok(())
    }

    async fn delete_where(&self, table_name: &str, filter: &str) -> Result<()> {
        let table = self.open(table_name).await?;
        table
            .delete(filter)
            .await
            .map_err(|e| db_error(e, VectorDbError::DeleteFailed))
            .with_context(|| format!("Failed to delete from '{}'", table_name))?;
        Ok(())
    }

    /// Filter hiding chunks of documents that are not `indexed`
    async fn searchable_filter(&self) -> Result<Option<String>> {
        let batches = self
            .query_batches(
                DOCUMENTS_TABLE,
                Some(format!(
                    "status != {}",
                    sql_string(DocumentStatus::Indexed.as_str())
                )),
                Some(vec!["id".to_string()]),
            )
            .await?;

        let mut hidden = Vec::new();
        for batch in &batches {
            let ids = column::<StringArray>(batch, "id")?;
            hidden.extend((0..batch.num_rows()).map(|i| sql_string(ids.value(i))));
        }

        if hidden.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!("document_id NOT IN ({})", hidden.join(", "))))
    }

    /// The `limit` nearest chunks by cosine distance, in insertion order
    async fn search_candidates(
        &self,
        table: &Table,
        query: &[f32],
        limit: usize,
        filter: Option<String>,
    ) -> Result<Vec<ScoredChunk>> {
        let mut search = table
            .vector_search(query.to_vec())
            .context("Failed to create vector search")?
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(filter) = filter {
            search = search.only_if(filter);
        }

        let batches: Vec<RecordBatch> = search
            .execute()
            .await
            .map_err(|e| db_error(e, VectorDbError::SearchFailed))?
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        let mut candidates: Vec<(i64, ScoredChunk)> = Vec::new();
        for batch in &batches {
            let distances = column::<Float32Array>(batch, "_distance")?;
            for (i, (chunk, seq)) in chunks_from_batch(batch)?.into_iter().enumerate() {
                // Cosine distance is 1 - similarity; zero vectors yield NaN
                let distance = distances.value(i);
                let score = if distance.is_finite() {
                    (1.0 - distance).clamp(-1.0, 1.0)
                } else {
                    0.0
                };
                candidates.push((seq, ScoredChunk { chunk, score }));
            }
        }

        candidates.sort_by_key(|(seq, _)| *seq);
        Ok(candidates.into_iter().map(|(_, scored)| scored).collect())
    }

    /// Chunk indices already stored for each document
    async fn existing_indices(&self, document_ids: &BTreeSet<&str>) -> Result<HashSet<(String, usize)>> {
        let mut existing = HashSet::new();
        for document_id in document_ids {
            let batches = self
                .query_batches(
                    CHUNKS_TABLE,
                    Some(format!("document_id = {}", sql_string(document_id))),
                    Some(vec!["chunk_index".to_string()]),
                )
                .await?;
            for batch in &batches {
                let indices = column::<UInt32Array>(batch, "chunk_index")?;
                for i in 0..batch.num_rows() {
                    existing.insert((document_id.to_string(), indices.value(i) as usize));
                }
            }
        }
        Ok(existing)
    }
}

/// Quote a value for a Lance SQL filter
fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Whether the worst fetched score still equals the k-th best, so rows
/// beyond the fetch could tie with the last kept one
fn tied_past_cut(candidates: &[ScoredChunk], k: usize) -> bool {
    let mut scores: Vec<f32> = candidates.iter().map(|c| c.score).collect();
    if scores.len() <= k {
        return false;
    }
    scores.sort_by(|a, b| b.total_cmp(a));
    scores[k - 1] == scores[scores.len() - 1]
}

/// Classify a LanceDB failure; I/O problems anywhere in the chain are
/// treated as connection failures so the retry policy picks them up
fn db_error(e: lancedb::Error, otherwise: fn(String) -> VectorDbError) -> VectorDbError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&e);
    while let Some(err) = source {
        if err.downcast_ref::<std::io::Error>().is_some() {
            return VectorDbError::ConnectionFailed(e.to_string());
        }
        source = err.source();
    }
    otherwise(e.to_string())
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("Invalid {} column type", name))
}

fn parse_field<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse::<T>().map_err(anyhow::Error::msg)
}

fn document_batch(document: &Document) -> Result<RecordBatch> {
    RecordBatch::try_new(
        LanceVectorStore::documents_schema(),
        vec![
            Arc::new(StringArray::from(vec![document.id.as_str()])),
            Arc::new(StringArray::from(vec![document.title.as_str()])),
            Arc::new(StringArray::from(vec![document.content.as_str()])),
            Arc::new(StringArray::from(vec![document.source_type.as_str()])),
            Arc::new(StringArray::from(vec![document.status.as_str()])),
            Arc::new(UInt32Array::from(vec![document.chunk_count as u32])),
            Arc::new(StringArray::from(vec![document.content_hash.as_str()])),
            Arc::new(BooleanArray::from(vec![document.degraded])),
            Arc::new(StringArray::from(vec![document.failure_reason.as_deref()])),
            Arc::new(Int64Array::from(vec![document.created_at])),
            Arc::new(Int64Array::from(vec![document.updated_at])),
        ],
    )
    .context("Failed to create document RecordBatch")
}

fn documents_from_batch(batch: &RecordBatch) -> Result<Vec<Document>> {
    let ids = column::<StringArray>(batch, "id")?;
    let titles = column::<StringArray>(batch, "title")?;
    let contents = column::<StringArray>(batch, "content")?;
    let source_types = column::<StringArray>(batch, "source_type")?;
    let statuses = column::<StringArray>(batch, "status")?;
    let chunk_counts = column::<UInt32Array>(batch, "chunk_count")?;
    let hashes = column::<StringArray>(batch, "content_hash")?;
    let degraded = column::<BooleanArray>(batch, "degraded")?;
    let reasons = column::<StringArray>(batch, "failure_reason")?;
    let created = column::<Int64Array>(batch, "created_at")?;
    let updated = column::<Int64Array>(batch, "updated_at")?;

    (0..batch.num_rows())
        .map(|i| -> Result<Document> {
            Ok(Document {
                id: ids.value(i).to_string(),
                title: titles.value(i).to_string(),
                content: contents.value(i).to_string(),
                source_type: parse_field(source_types.value(i))?,
                status: parse_field(statuses.value(i))?,
                chunk_count: chunk_counts.value(i) as usize,
                content_hash: hashes.value(i).to_string(),
                degraded: degraded.value(i),
                failure_reason: (!reasons.is_null(i)).then(|| reasons.value(i).to_string()),
                created_at: created.value(i),
                updated_at: updated.value(i),
            })
        })
        .collect()
}

fn chunk_batch(chunks: &[Chunk], dimension: usize, first_seq: i64) -> Result<RecordBatch> {
    let vectors = chunks
        .iter()
        .map(|c| {
            c.embedding
                .as_ref()
                .map(|v| Some(v.iter().copied().map(Some).collect::<Vec<_>>()))
        })
        .collect::<Vec<_>>();
    let vector_array =
        FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, dimension as i32);

    let ids: Vec<String> = chunks.iter().map(Chunk::id).collect();
    let extras = chunks
        .iter()
        .map(|c| serde_json::to_string(&c.metadata.extra))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to serialize chunk metadata")?;

    RecordBatch::try_new(
        LanceVectorStore::chunks_schema(dimension),
        vec![
            Arc::new(vector_array),
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from_iter_values(
                chunks.iter().map(|c| c.document_id.as_str()),
            )),
            Arc::new(UInt32Array::from_iter_values(
                chunks.iter().map(|c| c.chunk_index as u32),
            )),
            Arc::new(StringArray::from_iter_values(
                chunks.iter().map(|c| c.content.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                chunks.iter().map(|c| c.metadata.kind.as_str()),
            )),
            Arc::new(UInt32Array::from_iter_values(
                chunks.iter().map(|c| c.metadata.start_offset as u32),
            )),
            Arc::new(UInt32Array::from_iter_values(
                chunks.iter().map(|c| c.metadata.end_offset as u32),
            )),
            Arc::new(StringArray::from_iter_values(
                chunks.iter().map(|c| c.metadata.source_type.as_str()),
            )),
            Arc::new(StringArray::from(extras)),
            Arc::new(StringArray::from_iter_values(chunks.iter().map(|c| {
                c.embedding_source
                    .map(|s| s.as_str())
                    .unwrap_or("model")
            }))),
            Arc::new(Int64Array::from_iter_values(
                (0..chunks.len()).map(|i| first_seq + i as i64),
            )),
        ],
    )
    .context("Failed to create chunk RecordBatch")
}

/// Rows of a chunks batch with their insertion sequence
fn chunks_from_batch(batch: &RecordBatch) -> Result<Vec<(Chunk, i64)>> {
    let document_ids = column::<StringArray>(batch, "document_id")?;
    let indices = column::<UInt32Array>(batch, "chunk_index")?;
    let contents = column::<StringArray>(batch, "content")?;
    let kinds = column::<StringArray>(batch, "kind")?;
    let starts = column::<UInt32Array>(batch, "start_offset")?;
    let ends = column::<UInt32Array>(batch, "end_offset")?;
    let source_types = column::<StringArray>(batch, "source_type")?;
    let extras = column::<StringArray>(batch, "extra")?;
    let sources = column::<StringArray>(batch, "embedding_source")?;
    let seqs = column::<Int64Array>(batch, "inserted_seq")?;
    let vectors = batch
        .column_by_name("vector")
        .and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());

    (0..batch.num_rows())
        .map(|i| -> Result<(Chunk, i64)> {
            let embedding = vectors.and_then(|list| {
                let values = list.value(i);
                values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .map(|floats| floats.values().to_vec())
            });

            let metadata = ChunkMetadata {
                kind: parse_field(kinds.value(i))?,
                start_offset: starts.value(i) as usize,
                end_offset: ends.value(i) as usize,
                source_type: parse_field(source_types.value(i))?,
                extra: serde_json::from_str(extras.value(i)).with_context(|| {
                    format!(
                        "Invalid extra metadata on chunk {}:{}",
                        document_ids.value(i),
                        indices.value(i)
                    )
                })?,
            };

            let chunk = Chunk {
                document_id: document_ids.value(i).to_string(),
                chunk_index: indices.value(i) as usize,
                content: contents.value(i).to_string(),
                metadata,
                embedding,
                embedding_source: Some(parse_field(sources.value(i))?),
            };
            Ok((chunk, seqs.value(i)))
        })
        .collect()
}

#[async_trait::async_trait]
impl VectorStore for LanceVectorStore {
    async fn initialize(&self, signature: &EmbeddingSignature) -> Result<()> {
        tracing::info!(
            "Initializing LanceDB corpus {} at {}",
            signature,
            self.db_path.display()
        );

        match self.read_signature_file()? {
            Some(stored) => ensure_signature_matches(&stored, signature)?,
            None => self.write_signature_file(signature)?,
        }

        self.ensure_table(DOCUMENTS_TABLE, Self::documents_schema())
            .await?;
        self.ensure_table(CHUNKS_TABLE, Self::chunks_schema(signature.dimension))
            .await?;

        let mut bound = self
            .signature
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire signature lock: {}", e))?;
        *bound = Some(signature.clone());
        Ok(())
    }

    async fn signature(&self) -> Result<Option<EmbeddingSignature>> {
        self.read_signature_file()
    }

    async fn upsert_document(&self, document: &Document) -> Result<()> {
        let batch = document_batch(document)?;
        self.delete_where(DOCUMENTS_TABLE, &format!("id = {}", sql_string(&document.id)))
            .await?;
        self.add_batch(DOCUMENTS_TABLE, batch).await
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<Document>> {
        let mut documents = self
            .query_documents(Some(format!("id = {}", sql_string(document_id))))
            .await?;
        Ok(documents.pop())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut documents = self.query_documents(None).await?;
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool> {
        let existed = self.get_document(document_id).await?.is_some();
        self.delete_chunks_by_document(document_id).await?;
        self.delete_where(DOCUMENTS_TABLE, &format!("id = {}", sql_string(document_id)))
            .await?;
        Ok(existed)
    }

    async fn bulk_insert_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let dimension = self.bound_dimension()?;

        let document_ids: BTreeSet<&str> = chunks.iter().map(|c| c.document_id.as_str()).collect();
        let mut seen = self.existing_indices(&document_ids).await?;

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

        let first_seq = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let batch = chunk_batch(&chunks, dimension, first_seq)?;
        let count = batch.num_rows();
        self.add_batch(CHUNKS_TABLE, batch).await?;

        tracing::debug!("Stored {} chunks", count);
        Ok(count)
    }

    async fn delete_chunks_by_document(&self, document_id: &str) -> Result<usize> {
        let filter = format!("document_id = {}", sql_string(document_id));
        let count = self.open(CHUNKS_TABLE).await?.count_rows(Some(filter.clone())).await?;
        if count > 0 {
            self.delete_where(CHUNKS_TABLE, &filter).await?;
            tracing::debug!("Deleted {} chunks of document {}", count, document_id);
        }
        Ok(count)
    }

    async fn count_chunks(&self, document_id: &str) -> Result<usize> {
        let filter = format!("document_id = {}", sql_string(document_id));
        Ok(self.open(CHUNKS_TABLE).await?.count_rows(Some(filter)).await?)
    }

    async fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> = self
            .query_chunks(Some(format!("document_id = {}", sql_string(document_id))))
            .await?
            .into_iter()
            .map(|(chunk, _)| chunk)
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
        let dimension = self.bound_dimension()?;
        check_dimension(dimension, query.len())?;

        let table = self.open(CHUNKS_TABLE).await?;
        let total = table.count_rows(None).await?;
        if k == 0 || total == 0 {
            return Ok(Vec::new());
        }

        let filter = self.searchable_filter().await?;

        // Lance cuts at `limit` before `rank_top_k` breaks ties, so widen
        // the limit until the rows past the k-th score are strictly worse
        let mut limit = (k + 1).min(total);
        let candidates = loop {
            let candidates = self
                .search_candidates(&table, query, limit, filter.clone())
                .await?;
            if candidates.len() < limit || limit >= total || !tied_past_cut(&candidates, k) {
                break candidates;
            }
            limit = (limit * 2).min(total);
        };

        Ok(rank_top_k(candidates, k, threshold))
    }

    async fn get_statistics(&self) -> Result<DatabaseStats> {
        let signature = self.read_signature_file()?;
        if !self.table_exists(DOCUMENTS_TABLE).await? || !self.table_exists(CHUNKS_TABLE).await? {
            return Ok(DatabaseStats {
                signature,
                ..Default::default()
            });
        }

        let mut status_counts: HashMap<String, usize> = HashMap::new();
        let status_batches = self
            .query_batches(DOCUMENTS_TABLE, None, Some(vec!["status".to_string()]))
            .await?;
        let mut total_documents = 0;
        for batch in &status_batches {
            let statuses = column::<StringArray>(batch, "status")?;
            for i in 0..batch.num_rows() {
                *status_counts.entry(statuses.value(i).to_string()).or_insert(0) += 1;
            }
            total_documents += batch.num_rows();
        }

        let mut kind_counts: HashMap<String, usize> = HashMap::new();
        let kind_batches = self
            .query_batches(CHUNKS_TABLE, None, Some(vec!["kind".to_string()]))
            .await?;
        let mut total_chunks = 0;
        for batch in &kind_batches {
            let kinds = column::<StringArray>(batch, "kind")?;
            for i in 0..batch.num_rows() {
                *kind_counts.entry(kinds.value(i).to_string()).or_insert(0) += 1;
            }
            total_chunks += batch.num_rows();
        }

        Ok(DatabaseStats {
            total_documents,
            total_chunks,
            status_breakdown: into_breakdown(status_counts),
            kind_breakdown: into_breakdown(kind_counts),
            signature,
        })
    }

    async fn clear(&self) -> Result<()> {
        for name in [DOCUMENTS_TABLE, CHUNKS_TABLE] {
            if self.table_exists(name).await? {
                self.connection
                    .drop_table(name, &[])
                    .await
                    .with_context(|| format!("Failed to drop table '{}'", name))?;
            }
        }

        let path = self.signature_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove corpus signature")?;
        }

        let mut bound = self
            .signature
            .write()
            .map_err(|e| anyhow::anyhow!("Failed to acquire signature lock: {}", e))?;
        *bound = None;

        tracing::info!("Cleared LanceDB corpus at {}", self.db_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
