/// Benchmarks for chunking and similarity search
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use faq_rag::config::{Config, EmbeddingStrategy};
use faq_rag::indexer::{DocumentChunker, RecursiveSplitter};
use faq_rag::{IndexDocumentRequest, RagClient, SearchRequest, SourceType};
use tokio::runtime::Runtime;

/// FAQ-like text with paragraphs, sentences and the odd table
fn faq_text(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            if i % 10 == 9 {
                format!(
                    "| Plan | Price |\n| --- | --- |\n| Basic {} | {} USD |\n| Pro {} | {} USD |",
                    i,
                    i * 2,
                    i,
                    i * 5
                )
            } else {
                format!(
                    "Question {}: How long does delivery to region {} take? \
                     Orders placed before noon ship the same day. \
                     Delivery usually takes {} business days and tracking is sent by email.",
                    i,
                    i % 17,
                    i % 5 + 1
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn benchmark_splitting(c: &mut Criterion) {
    let mut group = c.benchmark_group("splitting");
    let splitter = RecursiveSplitter::default();

    for paragraphs in [10, 100, 1000].iter() {
        let text = faq_text(*paragraphs);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_paragraphs", paragraphs)),
            &text,
            |b, text| {
                b.iter(|| splitter.split_with_offsets(black_box(text)));
            },
        );
    }

    group.finish();
}

fn benchmark_chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunking");
    let chunker = DocumentChunker::default();

    for paragraphs in [10, 100, 1000].iter() {
        let text = faq_text(*paragraphs);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_paragraphs", paragraphs)),
            &text,
            |b, text| {
                b.iter(|| chunker.chunk_document("bench", black_box(text), SourceType::PlainText));
            },
        );
    }

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search");

    for documents in [10, 100].iter() {
        let client = rt.block_on(async {
            let mut config = Config::default();
            config.vector_db.backend = "memory".to_string();
            config.embedding.strategy = EmbeddingStrategy::Hash;
            config.indexing.chunk_size = 300;
            config.indexing.chunk_overlap = 50;

            let client = RagClient::with_config(config).await.unwrap();
            for i in 0..*documents {
                client
                    .index_document(IndexDocumentRequest {
                        document_id: format!("faq-{}", i),
                        title: None,
                        content: faq_text(5 + i % 7),
                        source_type: SourceType::PlainText,
                        force: false,
                    })
                    .await
                    .unwrap();
            }
            client
        });

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_documents", documents)),
            &client,
            |b, client| {
                b.iter(|| {
                    rt.block_on(async {
                        client
                            .search(black_box(SearchRequest {
                                query: "how long does delivery take".to_string(),
                                limit: 5,
                                threshold: None,
                            }))
                            .await
                            .unwrap()
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_splitting, benchmark_chunking, benchmark_search);
criterion_main!(benches);
