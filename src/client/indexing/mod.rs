use super::RagClient;
use super::index_lock::DocumentLockGuard;
use crate::error::{ChunkingError, IndexingError};
use crate::indexer::{decode_source, decode_str, normalize_text};
use crate::types::{
    Document, DocumentStatus, IndexDocumentResponse, SourceType, content_hash,
};
use anyhow::{Context, Result};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Helper macro to check for cancellation and return early if cancelled
macro_rules! check_cancelled {
    ($cancel_token:expr) => {
        if $cancel_token.is_cancelled() {
            tracing::info!("Indexing operation cancelled");
            return Err(IndexingError::Cancelled.into());
        }
    };
}

/// Raw content of an indexing job
pub(crate) enum SourceContent {
    /// Text as submitted; web pages still carry markup
    Text(String),
    /// Bytes to decode according to the source type
    Bytes(Vec<u8>),
    /// Text that already went through decoding and normalization
    Normalized(String),
}

impl SourceContent {
    fn len(&self) -> usize {
        match self {
            SourceContent::Text(text) | SourceContent::Normalized(text) => text.len(),
            SourceContent::Bytes(bytes) => bytes.len(),
        }
    }
}

pub(crate) struct IndexJob {
    pub(crate) document_id: String,
    pub(crate) title: Option<String>,
    pub(crate) source_type: SourceType,
    pub(crate) content: SourceContent,
    pub(crate) force: bool,
}

/// Counts from a run that reached `indexed`
struct StageOutcome {
    chunks_created: usize,
    embeddings_generated: usize,
    fallback_count: usize,
    degraded: bool,
}

/// Decode and normalize job content
///
/// Errors here are input errors: the document is failed without retrying.
fn prepare_text(
    content: SourceContent,
    source_type: SourceType,
    document_id: &str,
    max_bytes: usize,
) -> Result<String, IndexingError> {
    let size = content.len();
    if size > max_bytes {
        return Err(IndexingError::DocumentTooLarge {
            size,
            max: max_bytes,
        });
    }

    let decoded = match content {
        SourceContent::Text(raw) => decode_str(&raw, source_type),
        SourceContent::Bytes(bytes) => decode_source(&bytes, source_type)?,
        SourceContent::Normalized(text) => text,
    };

    let text = normalize_text(&decoded);
    if text.is_empty() {
        return Err(IndexingError::EmptyDocument(document_id.to_string()));
    }
    Ok(text)
}

/// Index one document end to end
///
/// Holds the document's lock for the whole run. Unchanged content is skipped
/// unless `force` is set. Any stage failure removes partial chunks and leaves
/// the document `failed`; that outcome is an `Ok` response. `Err` is reserved
/// for lock errors and for a rollback that could not be completed.
pub(crate) async fn do_index_document(
    client: &RagClient,
    job: IndexJob,
    cancel_token: CancellationToken,
) -> Result<IndexDocumentResponse> {
    let start = Instant::now();
    let mut guard = client.locks.acquire(&job.document_id).await?;
    let document_id = job.document_id.clone();

    let existing = client
        .retry
        .run_transient("load document", || client.store.get_document(&document_id))
        .await
        .context("Failed to load document")?;

    let prepared = prepare_text(
        job.content,
        job.source_type,
        &document_id,
        client.config.indexing.max_document_bytes,
    );

    if let (Ok(text), Some(stored)) = (&prepared, &existing)
        && !job.force
        && stored.status == DocumentStatus::Indexed
        && stored.content_hash == content_hash(text)
    {
        tracing::info!("Document '{}' unchanged, skipping", document_id);
        let response = IndexDocumentResponse {
            document_id: document_id.clone(),
            status: DocumentStatus::Indexed,
            chunks_created: 0,
            embeddings_generated: 0,
            fallback_count: 0,
            degraded: stored.degraded,
            skipped: true,
            duration_ms: start.elapsed().as_millis() as u64,
            error: None,
        };
        guard.release(Some(&response));
        return Ok(response);
    }

    let title = job
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| existing.as_ref().map(|d| d.title.clone()))
        .unwrap_or_else(|| document_id.clone());

    let mut document = match existing {
        Some(mut document) => {
            if document.status == DocumentStatus::Processing {
                // We hold the lock, so no live run owns this state
                tracing::warn!(
                    "Document '{}' was left processing by an earlier run",
                    document_id
                );
                document.status = DocumentStatus::Failed;
            }
            document.title = title;
            document.source_type = job.source_type;
            document
        }
        None => Document::new(document_id.as_str(), title, "", job.source_type),
    };
    document.transition_to(DocumentStatus::Processing)?;

    tracing::info!("Indexing document '{}'", document_id);

    let outcome = match prepared {
        Ok(text) => {
            document.set_content(text);
            run_stages(client, &mut document, &mut guard, &cancel_token).await
        }
        Err(e) => Err(e.into()),
    };

    let duration_ms = || start.elapsed().as_millis() as u64;
    let response = match outcome {
        Ok(outcome) => {
            tracing::info!(
                "Indexed '{}': {} chunks, {} fallback embeddings{}",
                document_id,
                outcome.chunks_created,
                outcome.fallback_count,
                if outcome.degraded { " (degraded)" } else { "" }
            );
            IndexDocumentResponse {
                document_id: document_id.clone(),
                status: DocumentStatus::Indexed,
                chunks_created: outcome.chunks_created,
                embeddings_generated: outcome.embeddings_generated,
                fallback_count: outcome.fallback_count,
                degraded: outcome.degraded,
                skipped: false,
                duration_ms: duration_ms(),
                error: None,
            }
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::warn!("Indexing of '{}' failed: {}", document_id, reason);

            // On error the guard stays armed and retries the rollback on drop
            roll_back(client, &mut document, &reason)
                .await
                .with_context(|| format!("Failed to roll back document '{}'", document_id))?;
            guard.disarm();

            IndexDocumentResponse::failed(&document_id, reason, duration_ms())
        }
    };

    guard.release(Some(&response));
    Ok(response)
}

/// Persist, chunk, embed and write one document that is `processing`
async fn run_stages(
    client: &RagClient,
    document: &mut Document,
    guard: &mut DocumentLockGuard,
    cancel_token: &CancellationToken,
) -> Result<StageOutcome> {
    let store = &client.store;
    let retry = &client.retry;

    {
        let snapshot: &Document = document;
        retry
            .run_transient("save document", || store.upsert_document(snapshot))
            .await
            .context("Failed to save document")?;
    }
    guard.arm(store.clone(), document.clone());

    check_cancelled!(cancel_token);
    let document_id = document.id.as_str();
    let removed = retry
        .run_transient("delete old chunks", || {
            store.delete_chunks_by_document(document_id)
        })
        .await
        .context("Failed to delete existing chunks")?;
    if removed > 0 {
        tracing::debug!("Removed {} old chunks of '{}'", removed, document_id);
    }

    let mut chunks =
        client
            .chunker
            .chunk_document(document_id, &document.content, document.source_type);
    if chunks.is_empty() {
        return Err(ChunkingError::NoChunksGenerated(document_id.to_string()).into());
    }
    tracing::debug!("Split '{}' into {} chunks", document_id, chunks.len());

    check_cancelled!(cancel_token);
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embedded = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => {
            tracing::info!("Indexing operation cancelled during embedding");
            return Err(IndexingError::Cancelled.into());
        }
        embedded = client.embedder.embed_batch(texts) => embedded,
    };

    if embedded.results.len() != chunks.len() {
        anyhow::bail!(
            "Embedding returned {} vectors for {} chunks",
            embedded.results.len(),
            chunks.len()
        );
    }

    let fallback_count = embedded.fallback_count;
    let fallback_ratio = embedded.fallback_ratio();
    let degraded = fallback_ratio > client.config.indexing.max_fallback_ratio;
    if degraded {
        tracing::warn!(
            "Document '{}' is degraded: {}/{} chunks have substitute vectors",
            document_id,
            fallback_count,
            chunks.len()
        );
    }

    for (chunk, result) in chunks.iter_mut().zip(embedded.results) {
        chunk.embedding = Some(result.vector);
        chunk.embedding_source = Some(result.source);
    }

    let total = chunks.len();
    let mut written = 0;
    for batch in chunks.chunks(client.config.indexing.write_batch_size) {
        check_cancelled!(cancel_token);
        let first = written;
        written += retry
            .run_transient("insert chunks", || store.bulk_insert_chunks(batch.to_vec()))
            .await
            .with_context(|| {
                format!("Failed to write chunks {}..{}", first, first + batch.len())
            })?;
    }
    tracing::debug!("Wrote {} chunks of '{}'", written, document_id);

    document.mark_indexed(written, degraded)?;
    {
        let snapshot: &Document = document;
        retry
            .run_transient("save document", || store.upsert_document(snapshot))
            .await
            .context("Failed to mark document indexed")?;
    }
    guard.disarm();

    Ok(StageOutcome {
        chunks_created: written,
        embeddings_generated: total,
        fallback_count,
        degraded,
    })
}

/// Remove whatever chunks the document owns and record it as failed
async fn roll_back(client: &RagClient, document: &mut Document, reason: &str) -> Result<()> {
    let store = &client.store;
    {
        let document_id = document.id.as_str();
        let removed = client
            .retry
            .run_transient("delete partial chunks", || {
                store.delete_chunks_by_document(document_id)
            })
            .await?;
        if removed > 0 {
            tracing::warn!("Rolled back {} chunks of '{}'", removed, document_id);
        }
    }

    // Only the final save may have failed, leaving the local record `indexed`
    document.status = DocumentStatus::Processing;
    document.mark_failed(reason)?;
    let snapshot: &Document = document;
    client
        .retry
        .run_transient("save document", || store.upsert_document(snapshot))
        .await
}
