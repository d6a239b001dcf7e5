//! Text cleanup applied to every document before chunking

use crate::error::IndexingError;
use regex::Regex;
use std::sync::LazyLock;

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\x0B\x0C]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Decode raw bytes as UTF-8 text
///
/// Binary input is an input error and is never retried.
pub fn decode_text(bytes: &[u8]) -> Result<String, IndexingError> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|e| IndexingError::InvalidUtf8(e.to_string()))
}

/// Normalize extracted text for chunking
///
/// Line endings become `\n`, control characters and non-breaking spaces
/// become spaces, horizontal whitespace runs collapse to one space, every
/// line is trimmed and runs of blank lines collapse to a single blank line.
pub fn normalize_text(raw: &str) -> String {
    let text = raw.strip_prefix('\u{FEFF}').unwrap_or(raw);
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\t' => c,
            '\u{00A0}' | '\u{2007}' | '\u{202F}' | '\u{3000}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let lines: Vec<String> = cleaned
        .lines()
        .map(|line| HORIZONTAL_WS.replace_all(line, " ").trim().to_string())
        .collect();

    let joined = lines.join("\n");
    BLANK_LINES.replace_all(&joined, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize_text("hello    world\t\tagain"), "hello world again");
    }

    #[test]
    fn test_collapses_blank_lines() {
        let input = "first\n\n\n\n\nsecond\n\nthird";
        assert_eq!(normalize_text(input), "first\n\nsecond\n\nthird");
    }

    #[test]
    fn test_whitespace_only_lines_count_as_blank() {
        let input = "first\n   \n \t \n\nsecond";
        assert_eq!(normalize_text(input), "first\n\nsecond");
    }

    #[test]
    fn test_trims_lines_and_result() {
        assert_eq!(normalize_text("  \n  padded line  \n  "), "padded line");
    }

    #[test]
    fn test_line_endings() {
        assert_eq!(normalize_text("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strips_bom_and_controls() {
        assert_eq!(normalize_text("\u{FEFF}abc\u{0}def"), "abc def");
        assert_eq!(normalize_text("non\u{00A0}breaking"), "non breaking");
    }

    #[test]
    fn test_preserves_cjk() {
        assert_eq!(normalize_text("第一章　概述"), "第一章 概述");
    }

    #[test]
    fn test_idempotent() {
        let input = "  Title \r\n\r\n\r\nBody   text.\n\n\n\nMore ";
        let once = normalize_text(input);
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text(" \n\n \t"), "");
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text("héllo".as_bytes()).unwrap(), "héllo");
        let err = decode_text(&[0x66, 0xFF, 0xFE, 0x00]).unwrap_err();
        assert!(matches!(err, IndexingError::InvalidUtf8(_)));
    }
}
