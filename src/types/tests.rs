use super::*;

#[test]
fn test_search_request_defaults() {
    let req: SearchRequest = serde_json::from_str(r#"{"query": "refund policy"}"#).unwrap();

    assert_eq!(req.limit, 5);
    assert!(req.threshold.is_none());
    assert!(req.validate().is_ok());
}

#[test]
fn test_index_request_defaults() {
    let req: IndexDocumentRequest =
        serde_json::from_str(r#"{"document_id": "faq-1", "content": "Hello"}"#).unwrap();

    assert_eq!(req.source_type, SourceType::PlainText);
    assert!(req.title.is_none());
    assert!(!req.force);
}

#[test]
fn test_source_type_serialization() {
    let json = serde_json::to_string(&SourceType::StructuredBinaryExtract).unwrap();
    assert_eq!(json, "\"structured_binary_extract\"");

    let parsed: SourceType = serde_json::from_str("\"web_page\"").unwrap();
    assert_eq!(parsed, SourceType::WebPage);
}

#[test]
fn test_source_type_from_str_aliases() {
    assert_eq!("pdf".parse::<SourceType>().unwrap(), SourceType::StructuredBinaryExtract);
    assert_eq!("HTML".parse::<SourceType>().unwrap(), SourceType::WebPage);
    assert_eq!("plain-text".parse::<SourceType>().unwrap(), SourceType::PlainText);
    assert!("docx".parse::<SourceType>().is_err());
}

#[test]
fn test_status_and_kind_parse_their_display() {
    for status in [
        DocumentStatus::Pending,
        DocumentStatus::Processing,
        DocumentStatus::Indexed,
        DocumentStatus::Failed,
    ] {
        assert_eq!(status.to_string().parse::<DocumentStatus>().unwrap(), status);
    }
    for kind in [
        ChunkKind::Text,
        ChunkKind::Table,
        ChunkKind::Title,
        ChunkKind::ImageDerived,
    ] {
        assert_eq!(kind.as_str().parse::<ChunkKind>().unwrap(), kind);
    }
    assert!("archived".parse::<DocumentStatus>().is_err());
}

// ===== State Machine Tests =====

#[test]
fn test_allowed_transitions() {
    use DocumentStatus::*;

    assert!(Pending.can_transition_to(Processing));
    assert!(Processing.can_transition_to(Indexed));
    assert!(Processing.can_transition_to(Failed));
    assert!(Indexed.can_transition_to(Processing));
    assert!(Failed.can_transition_to(Processing));
}

#[test]
fn test_rejected_transitions() {
    use DocumentStatus::*;

    assert!(!Pending.can_transition_to(Indexed));
    assert!(!Pending.can_transition_to(Failed));
    assert!(!Indexed.can_transition_to(Failed));
    assert!(!Failed.can_transition_to(Indexed));
    assert!(!Processing.can_transition_to(Processing));
    assert!(!Indexed.can_transition_to(Pending));
}

#[test]
fn test_document_lifecycle() {
    let mut doc = Document::new("faq-1", "Shipping", "Orders ship daily.", SourceType::PlainText);
    assert_eq!(doc.status, DocumentStatus::Pending);
    assert_eq!(doc.content_hash, content_hash("Orders ship daily."));

    doc.transition_to(DocumentStatus::Processing).unwrap();
    doc.mark_indexed(3, false).unwrap();
    assert_eq!(doc.status, DocumentStatus::Indexed);
    assert_eq!(doc.chunk_count, 3);

    doc.transition_to(DocumentStatus::Processing).unwrap();
    doc.mark_failed("embedding timed out").unwrap();
    assert_eq!(doc.status, DocumentStatus::Failed);
    assert_eq!(doc.chunk_count, 0);
    assert_eq!(doc.failure_reason.as_deref(), Some("embedding timed out"));

    doc.transition_to(DocumentStatus::Processing).unwrap();
    doc.mark_indexed(1, true).unwrap();
    assert!(doc.degraded);
    assert!(doc.failure_reason.is_none());
}

#[test]
fn test_invalid_transition_is_an_error() {
    let mut doc = Document::new("faq-1", "Shipping", "text", SourceType::PlainText);
    let err = doc.mark_indexed(1, false).unwrap_err();

    assert!(matches!(err, IndexingError::InvalidTransition { .. }));
    assert_eq!(doc.status, DocumentStatus::Pending);
}

#[test]
fn test_set_content_updates_hash() {
    let mut doc = Document::new("faq-1", "Shipping", "old", SourceType::PlainText);
    doc.set_content("new".to_string());

    assert_eq!(doc.content, "new");
    assert_eq!(doc.content_hash, content_hash("new"));
    assert_ne!(content_hash("old"), content_hash("new"));
}

// ===== Chunk and Result Tests =====

#[test]
fn test_chunk_id_format() {
    let chunk = Chunk {
        document_id: "returns".to_string(),
        chunk_index: 4,
        content: "Items can be returned.".to_string(),
        metadata: ChunkMetadata::default(),
        embedding: None,
        embedding_source: None,
    };

    assert_eq!(chunk.id(), "returns:4");
    assert_eq!(chunk_id("returns", 4), chunk.id());
}

#[test]
fn test_search_hit_from_scored_chunk() {
    let scored = ScoredChunk {
        chunk: Chunk {
            document_id: "returns".to_string(),
            chunk_index: 1,
            content: "Refunds take five days.".to_string(),
            metadata: ChunkMetadata {
                kind: ChunkKind::Text,
                start_offset: 10,
                end_offset: 33,
                ..Default::default()
            },
            embedding: Some(vec![0.1, 0.2]),
            embedding_source: Some(EmbeddingSource::Model),
        },
        score: 0.87,
    };

    let hit = SearchHit::from(scored);
    assert_eq!(hit.chunk_id, "returns:1");
    assert_eq!(hit.document_id, "returns");
    assert_eq!(hit.metadata.end_offset, 33);
    assert_eq!(hit.score, 0.87);
}

#[test]
fn test_embedding_source_fallback() {
    assert!(!EmbeddingSource::Model.is_fallback());
    assert!(EmbeddingSource::Hash.is_fallback());
    assert!(EmbeddingSource::Zero.is_fallback());
}

// ===== Validation Tests =====

#[test]
fn test_document_id_validation() {
    let request = |id: &str| DocumentRequest {
        document_id: id.to_string(),
    };

    assert!(request("faq-1").validate().is_ok());
    assert!(request("").validate().is_err());
    assert!(request("   ").validate().is_err());
    assert!(request("bad\nid").validate().is_err());
    assert!(request(&"a".repeat(MAX_DOCUMENT_ID_LEN)).validate().is_ok());
    assert!(
        request(&"a".repeat(MAX_DOCUMENT_ID_LEN + 1))
            .validate()
            .is_err()
    );
}

#[test]
fn test_search_request_validation() {
    let request = |query: &str, limit: usize, threshold: Option<f32>| SearchRequest {
        query: query.to_string(),
        limit,
        threshold,
    };

    assert!(request("refund", 5, None).validate().is_ok());
    assert!(request("refund", MAX_SEARCH_LIMIT, Some(0.5)).validate().is_ok());
    assert!(request("", 5, None).validate().is_err());
    assert!(request("refund", 0, None).validate().is_err());
    assert!(request("refund", MAX_SEARCH_LIMIT + 1, None).validate().is_err());
    assert!(request("refund", 5, Some(-1.5)).validate().is_err());
}

#[test]
fn test_failed_response() {
    let response = IndexDocumentResponse::failed("faq-1", "empty document", 12);

    assert_eq!(response.status, DocumentStatus::Failed);
    assert_eq!(response.chunks_created, 0);
    assert_eq!(response.error.as_deref(), Some("empty document"));
    assert!(!response.skipped);
}

#[test]
fn test_document_serialization_defaults() {
    let json = r#"{
        "id": "faq-1",
        "title": "Shipping",
        "content": "text",
        "source_type": "plain_text",
        "status": "indexed",
        "chunk_count": 1,
        "content_hash": "abc",
        "created_at": 0,
        "updated_at": 0
    }"#;
    let doc: Document = serde_json::from_str(json).unwrap();

    assert!(!doc.degraded);
    assert!(doc.failure_reason.is_none());
    assert_eq!(doc.status, DocumentStatus::Indexed);
}
