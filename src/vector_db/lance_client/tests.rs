use super::*;
use crate::types::{ChunkKind, DocumentStatus, EmbeddingSource, SourceType};
use tempfile::TempDir;

fn signature(dimension: usize) -> EmbeddingSignature {
    EmbeddingSignature::new(EmbeddingSource::Hash, "hash-v1", dimension)
}

fn chunk(document_id: &str, chunk_index: usize, embedding: Vec<f32>) -> Chunk {
    Chunk {
        document_id: document_id.to_string(),
        chunk_index,
        content: format!("{} chunk {}", document_id, chunk_index),
        metadata: ChunkMetadata {
            kind: ChunkKind::Text,
            start_offset: chunk_index * 10,
            end_offset: chunk_index * 10 + 9,
            source_type: SourceType::PlainText,
            extra: Default::default(),
        },
        embedding: Some(embedding),
        embedding_source: Some(EmbeddingSource::Hash),
    }
}

async fn open_store(temp_dir: &TempDir) -> LanceVectorStore {
    let db_path = temp_dir
        .path()
        .join("lancedb")
        .to_string_lossy()
        .to_string();
    LanceVectorStore::with_path(&db_path).await.unwrap()
}

async fn initialized_store(temp_dir: &TempDir) -> LanceVectorStore {
    let store = open_store(temp_dir).await;
    store.initialize(&signature(3)).await.unwrap();
    store
}

#[test]
fn test_sql_string_escapes_quotes() {
    assert_eq!(sql_string("faq-1"), "'faq-1'");
    assert_eq!(sql_string("o'brien"), "'o''brien'");
}

#[test]
fn test_default_path() {
    let path = LanceVectorStore::default_lancedb_path();
    assert!(path.contains("faq-rag"));
    assert!(path.contains("lancedb"));
}

#[tokio::test]
async fn test_initialize_creates_tables_and_signature() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let table_names = store.connection.table_names().execute().await.unwrap();
    assert!(table_names.contains(&DOCUMENTS_TABLE.to_string()));
    assert!(table_names.contains(&CHUNKS_TABLE.to_string()));
    assert_eq!(store.signature().await.unwrap(), Some(signature(3)));
}

#[tokio::test]
async fn test_initialize_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;
    assert!(store.initialize(&signature(3)).await.is_ok());
}

#[tokio::test]
async fn test_reopen_with_other_signature_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    initialized_store(&temp_dir).await;

    let reopened = open_store(&temp_dir).await;
    let err = reopened.initialize(&signature(4)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<crate::error::ConfigError>(),
        Some(crate::error::ConfigError::EmbeddingMismatch { .. })
    ));
}

#[tokio::test]
async fn test_document_roundtrip_and_upsert() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let mut document = Document::new("faq-1", "Shipping", "Orders ship in 2 days.", SourceType::PlainText);
    store.upsert_document(&document).await.unwrap();

    let stored = store.get_document("faq-1").await.unwrap().unwrap();
    assert_eq!(stored, document);

    document.transition_to(DocumentStatus::Processing).unwrap();
    document.mark_failed("embedding provider down").unwrap();
    store.upsert_document(&document).await.unwrap();

    let documents = store.list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].status, DocumentStatus::Failed);
    assert_eq!(
        documents[0].failure_reason.as_deref(),
        Some("embedding provider down")
    );
}

#[tokio::test]
async fn test_get_missing_document() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;
    assert!(store.get_document("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bulk_insert_and_count() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let inserted = store
        .bulk_insert_chunks(vec![
            chunk("faq-1", 0, vec![1.0, 0.0, 0.0]),
            chunk("faq-1", 1, vec![0.0, 1.0, 0.0]),
            chunk("faq-2", 0, vec![0.0, 0.0, 1.0]),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 3);
    assert_eq!(store.count_chunks("faq-1").await.unwrap(), 2);
    assert_eq!(store.count_chunks("faq-2").await.unwrap(), 1);

    let chunks = store.chunks_for_document("faq-1").await.unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[1].metadata.start_offset, 10);
    assert_eq!(chunks[1].embedding_source, Some(EmbeddingSource::Hash));
}

#[tokio::test]
async fn test_bulk_insert_rejects_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    store
        .bulk_insert_chunks(vec![chunk("faq-1", 0, vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();

    let err = store
        .bulk_insert_chunks(vec![
            chunk("faq-1", 1, vec![0.0, 1.0, 0.0]),
            chunk("faq-1", 0, vec![0.0, 0.0, 1.0]),
        ])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VectorDbError>(),
        Some(VectorDbError::DuplicateChunk { chunk_index: 0, .. })
    ));
    // The whole batch was rejected
    assert_eq!(store.count_chunks("faq-1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_bulk_insert_rejects_wrong_dimension() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let err = store
        .bulk_insert_chunks(vec![chunk("faq-1", 0, vec![1.0, 0.0])])
        .await
        .unwrap_err();
    assert_eq!(crate::error::find_dimension_mismatch(&err), Some((3, 2)));
    assert_eq!(store.count_chunks("faq-1").await.unwrap(), 0);
}

#[tokio::test]
async fn test_nearest_neighbors_orders_by_similarity() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    store
        .bulk_insert_chunks(vec![
            chunk("faq-1", 0, vec![1.0, 0.0, 0.0]),
            chunk("faq-1", 1, vec![0.7, 0.7, 0.0]),
            chunk("faq-2", 0, vec![0.0, 0.0, 1.0]),
        ])
        .await
        .unwrap();

    let results = store
        .nearest_neighbors(&[1.0, 0.0, 0.0], 2, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.id(), "faq-1:0");
    assert_eq!(results[1].chunk.id(), "faq-1:1");
    assert!((results[0].score - 1.0).abs() < 1e-4);
    assert!(results[0].score >= results[1].score);

    let thresholded = store
        .nearest_neighbors(&[1.0, 0.0, 0.0], 3, Some(0.9))
        .await
        .unwrap();
    assert_eq!(thresholded.len(), 1);
}

#[tokio::test]
async fn test_nearest_neighbors_empty_and_mismatched() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    assert!(
        store
            .nearest_neighbors(&[1.0, 0.0, 0.0], 5, None)
            .await
            .unwrap()
            .is_empty()
    );

    let err = store
        .nearest_neighbors(&[1.0, 0.0], 5, None)
        .await
        .unwrap_err();
    assert_eq!(crate::error::find_dimension_mismatch(&err), Some((3, 2)));
}

#[tokio::test]
async fn test_search_before_initialize_fails() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir).await;
    let err = store
        .nearest_neighbors(&[1.0, 0.0, 0.0], 5, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<VectorDbError>(),
        Some(VectorDbError::NotInitialized)
    ));
}

#[tokio::test]
async fn test_delete_document_cascades() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let document = Document::new("faq-1", "Returns", "Returns within 30 days.", SourceType::PlainText);
    store.upsert_document(&document).await.unwrap();
    store
        .bulk_insert_chunks(vec![
            chunk("faq-1", 0, vec![1.0, 0.0, 0.0]),
            chunk("faq-1", 1, vec![0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    assert!(store.delete_document("faq-1").await.unwrap());
    assert!(store.get_document("faq-1").await.unwrap().is_none());
    assert_eq!(store.count_chunks("faq-1").await.unwrap(), 0);
    assert!(!store.delete_document("faq-1").await.unwrap());
}

#[tokio::test]
async fn test_delete_chunks_by_document() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    store
        .bulk_insert_chunks(vec![
            chunk("faq-1", 0, vec![1.0, 0.0, 0.0]),
            chunk("faq-2", 0, vec![0.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();

    assert_eq!(store.delete_chunks_by_document("faq-1").await.unwrap(), 1);
    assert_eq!(store.delete_chunks_by_document("faq-1").await.unwrap(), 0);
    assert_eq!(store.count_chunks("faq-2").await.unwrap(), 1);
}

#[tokio::test]
async fn test_statistics() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let mut indexed = Document::new("faq-1", "A", "alpha", SourceType::PlainText);
    indexed.transition_to(DocumentStatus::Processing).unwrap();
    indexed.mark_indexed(2, false).unwrap();
    store.upsert_document(&indexed).await.unwrap();
    store
        .upsert_document(&Document::new("faq-2", "B", "beta", SourceType::PlainText))
        .await
        .unwrap();

    let mut title = chunk("faq-1", 0, vec![1.0, 0.0, 0.0]);
    title.metadata.kind = ChunkKind::Title;
    store
        .bulk_insert_chunks(vec![title, chunk("faq-1", 1, vec![0.0, 1.0, 0.0])])
        .await
        .unwrap();

    let stats = store.get_statistics().await.unwrap();
    assert_eq!(stats.total_documents, 2);
    assert_eq!(stats.total_chunks, 2);
    assert!(stats.status_breakdown.contains(&("indexed".to_string(), 1)));
    assert!(stats.status_breakdown.contains(&("pending".to_string(), 1)));
    assert!(stats.kind_breakdown.contains(&("title".to_string(), 1)));
    assert_eq!(stats.signature, Some(signature(3)));
}

#[tokio::test]
async fn test_clear_removes_everything() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    store
        .bulk_insert_chunks(vec![chunk("faq-1", 0, vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();
    store.clear().await.unwrap();

    assert_eq!(store.signature().await.unwrap(), None);
    let stats = store.get_statistics().await.unwrap();
    assert_eq!(stats.total_chunks, 0);
    assert_eq!(stats.total_documents, 0);

    // A cleared store accepts a different signature
    assert!(store.initialize(&signature(4)).await.is_ok());
}

#[tokio::test]
async fn test_ties_at_the_limit_prefer_lower_chunk_index() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    // Same vector stored twice, the higher chunk index written first
    store
        .bulk_insert_chunks(vec![
            chunk("early", 0, vec![0.0, 1.0, 0.0]),
            chunk("early", 1, vec![0.0, 0.0, 1.0]),
            chunk("early", 2, vec![0.0, 1.0, 1.0]),
            chunk("early", 3, vec![1.0, 1.0, 0.0]),
        ])
        .await
        .unwrap();
    store
        .bulk_insert_chunks(vec![chunk("late", 0, vec![1.0, 1.0, 0.0])])
        .await
        .unwrap();

    let results = store
        .nearest_neighbors(&[1.0, 1.0, 0.0], 1, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.id(), "late:0");

    let results = store
        .nearest_neighbors(&[1.0, 1.0, 0.0], 2, None)
        .await
        .unwrap();
    let ids: Vec<String> = results.iter().map(|r| r.chunk.id()).collect();
    assert_eq!(ids, vec!["late:0", "early:3"]);
}

#[tokio::test]
async fn test_search_skips_documents_being_indexed() {
    let temp_dir = TempDir::new().unwrap();
    let store = initialized_store(&temp_dir).await;

    let mut ready = Document::new("ready", "Ready", "text", SourceType::PlainText);
    ready.transition_to(DocumentStatus::Processing).unwrap();
    ready.mark_indexed(1, false).unwrap();
    store.upsert_document(&ready).await.unwrap();

    let mut busy = Document::new("it's-busy", "Busy", "text", SourceType::PlainText);
    busy.transition_to(DocumentStatus::Processing).unwrap();
    store.upsert_document(&busy).await.unwrap();

    store
        .bulk_insert_chunks(vec![
            chunk("ready", 0, vec![0.6, 0.8, 0.0]),
            chunk("it's-busy", 0, vec![1.0, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let results = store
        .nearest_neighbors(&[1.0, 0.0, 0.0], 5, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].chunk.document_id, "ready");

    busy.mark_indexed(1, false).unwrap();
    store.upsert_document(&busy).await.unwrap();
    let results = store
        .nearest_neighbors(&[1.0, 0.0, 0.0], 5, None)
        .await
        .unwrap();
    assert_eq!(results[0].chunk.document_id, "it's-busy");
}

#[test]
fn test_corrupt_extra_metadata_is_an_error() {
    let batch = chunk_batch(&[chunk("faq-1", 0, vec![1.0, 0.0, 0.0])], 3, 0).unwrap();
    assert_eq!(chunks_from_batch(&batch).unwrap().len(), 1);

    let extra = batch.schema().index_of("extra").unwrap();
    let mut columns = batch.columns().to_vec();
    columns[extra] = Arc::new(StringArray::from(vec!["{not json"])) as Arc<dyn Array>;
    let corrupt = RecordBatch::try_new(batch.schema(), columns).unwrap();

    let err = chunks_from_batch(&corrupt).unwrap_err();
    assert!(err.to_string().contains("Invalid extra metadata on chunk faq-1:0"));
}
