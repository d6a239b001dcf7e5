use crate::types::ChunkKind;
use regex::Regex;
use std::sync::LazyLock;

/// Marker inserted by image text extraction in front of recognized text
pub const IMAGE_TEXT_MARKER: &str = "[IMAGE_TEXT]";

/// Titles are short; anything this long is body text
const MAX_TITLE_CHARS: usize = 100;
const MAX_TITLE_WORDS: usize = 12;

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\d+(?:\.\d+)*[.)、]?\s+\S|第[一二三四五六七八九十百零〇两\d]+[章节部篇条])",
    )
    .expect("valid regex")
});
static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}\s+\S").expect("valid regex"));

/// Label a chunk with ordered heuristics; the first matching rule wins
///
/// 1. table: a `|` on a chunk spanning more than two lines
/// 2. image derived: carries [`IMAGE_TEXT_MARKER`]
/// 3. title: one short heading-like line
/// 4. text
pub fn classify_chunk(content: &str) -> ChunkKind {
    let content = content.trim();

    if content.contains('|') && content.lines().count() > 2 {
        return ChunkKind::Table;
    }

    if content.contains(IMAGE_TEXT_MARKER) {
        return ChunkKind::ImageDerived;
    }

    if is_title(content) {
        return ChunkKind::Title;
    }

    ChunkKind::Text
}

fn is_title(content: &str) -> bool {
    if content.is_empty()
        || content.chars().count() >= MAX_TITLE_CHARS
        || content.lines().count() != 1
    {
        return false;
    }

    if MARKDOWN_HEADING.is_match(content) {
        return true;
    }

    if NUMBERED_HEADING.is_match(content) {
        return !ends_with_sentence_punctuation(content);
    }

    is_short_plain_line(content)
}

fn ends_with_sentence_punctuation(content: &str) -> bool {
    content
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | '!' | '?' | ';' | '。' | '！' | '？' | '；'))
}

/// Letters of any script, digits and a few joining marks, nothing that
/// reads like a sentence
fn is_short_plain_line(content: &str) -> bool {
    let all_allowed = content
        .chars()
        .all(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '-' | '&' | '\'' | '/'));

    all_allowed
        && content.chars().any(char::is_alphabetic)
        && content.split_whitespace().count() <= MAX_TITLE_WORDS
}
