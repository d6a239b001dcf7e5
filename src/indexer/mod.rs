//! Document preparation: decoding, normalization, splitting and classification
//!
//! Everything here is synchronous and free of I/O; the indexing pipeline in
//! [`crate::client`] drives it and hands the chunks on to embedding.

mod chunker;
mod classifier;
mod html;
mod normalizer;
mod pdf_extractor;
mod splitter;

pub use chunker::DocumentChunker;
pub use classifier::{IMAGE_TEXT_MARKER, classify_chunk};
pub use html::html_to_text;
pub use normalizer::{decode_text, normalize_text};
pub use pdf_extractor::extract_pdf_text;
pub use splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, RecursiveSplitter, TextSpan};

use crate::error::IndexingError;
use crate::types::SourceType;

/// Turn raw document bytes into text according to where they came from
///
/// The result is not normalized yet; pass it through [`normalize_text`].
pub fn decode_source(bytes: &[u8], source_type: SourceType) -> Result<String, IndexingError> {
    match source_type {
        SourceType::PlainText => decode_text(bytes),
        SourceType::WebPage => decode_text(bytes).map(|html| html_to_text(&html)),
        SourceType::StructuredBinaryExtract => extract_pdf_text(bytes),
    }
}

/// Text form of content that arrived as a string
pub fn decode_str(content: &str, source_type: SourceType) -> String {
    match source_type {
        SourceType::WebPage => html_to_text(content),
        SourceType::PlainText | SourceType::StructuredBinaryExtract => content.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_text() {
        let text = decode_source("Opening hours".as_bytes(), SourceType::PlainText).unwrap();
        assert_eq!(text, "Opening hours");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_source(&[0xC3, 0x28], SourceType::PlainText).unwrap_err();
        assert!(matches!(err, IndexingError::InvalidUtf8(_)));

        let err = decode_source(&[0xC3, 0x28], SourceType::WebPage).unwrap_err();
        assert!(matches!(err, IndexingError::InvalidUtf8(_)));
    }

    #[test]
    fn test_decode_web_page() {
        let text = decode_source(b"<h1>Help</h1><p>Ask us</p>", SourceType::WebPage).unwrap();
        assert_eq!(normalize_text(&text), "# Help\n\nAsk us");
    }

    #[test]
    fn test_decode_str_passes_extracted_text_through() {
        let text = "already extracted | text";
        assert_eq!(decode_str(text, SourceType::StructuredBinaryExtract), text);
        assert_eq!(decode_str("<b>bold</b>", SourceType::WebPage), "bold");
    }
}
