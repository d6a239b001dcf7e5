use super::classifier::classify_chunk;
use super::splitter::{RecursiveSplitter, TextSpan};
use crate::error::ChunkingError;
use crate::types::{Chunk, ChunkKind, ChunkMetadata, SourceType};

/// Turns a normalized document into classified, not yet embedded chunks
///
/// A paragraph that reads as a heading is always a chunk of its own, so
/// titles are never merged into the body text that follows them.
pub struct DocumentChunker {
    splitter: RecursiveSplitter,
}

impl DocumentChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        Ok(Self {
            splitter: RecursiveSplitter::new(chunk_size, overlap)?,
        })
    }

    pub fn splitter(&self) -> &RecursiveSplitter {
        &self.splitter
    }

    /// Split and classify `text`; chunk indices follow split order from 0
    pub fn chunk_document(
        &self,
        document_id: &str,
        text: &str,
        source_type: SourceType,
    ) -> Vec<Chunk> {
        self.split_sections(text)
            .into_iter()
            .enumerate()
            .map(|(chunk_index, span)| {
                let metadata = ChunkMetadata {
                    kind: classify_chunk(&span.text),
                    start_offset: span.start,
                    end_offset: span.end,
                    source_type,
                    extra: Default::default(),
                };

                Chunk {
                    document_id: document_id.to_string(),
                    chunk_index,
                    content: span.text,
                    metadata,
                    embedding: None,
                    embedding_source: None,
                }
            })
            .collect()
    }

    /// Split each section separately, shifting spans back to document offsets
    fn split_sections(&self, text: &str) -> Vec<TextSpan> {
        let mut spans = Vec::new();
        for (char_offset, section) in sections(text) {
            spans.extend(self.splitter.split_with_offsets(section).into_iter().map(|span| {
                TextSpan {
                    text: span.text,
                    start: span.start + char_offset,
                    end: span.end + char_offset,
                }
            }));
        }
        spans
    }
}

/// Cut `text` before and after every heading paragraph
///
/// Returns each section with the char offset it starts at. The sections
/// concatenate back to `text`.
fn sections(text: &str) -> Vec<(usize, &str)> {
    let mut sections = Vec::new();
    // Byte and char position where the open section starts
    let mut open = (0, 0);
    let mut byte = 0;
    let mut chars = 0;

    for paragraph in text.split_inclusive("\n\n") {
        let len = paragraph.chars().count();
        if classify_chunk(paragraph) == ChunkKind::Title {
            if byte > open.0 {
                sections.push((open.1, &text[open.0..byte]));
            }
            sections.push((chars, paragraph));
            open = (byte + paragraph.len(), chars + len);
        }
        byte += paragraph.len();
        chars += len;
    }

    if byte > open.0 {
        sections.push((open.1, &text[open.0..byte]));
    }
    sections
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self {
            splitter: RecursiveSplitter::default(),
        }
    }
}
