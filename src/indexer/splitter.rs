//! Recursive character splitter
//!
//! Text is cut at the coarsest boundary it contains (paragraph, line,
//! sentence, word, character) and the pieces are merged greedily back into
//! chunks of at most `chunk_size` characters. After each emitted chunk the
//! window keeps trailing text worth at most `overlap` characters, so
//! consecutive chunks share their boundary text. When the last piece is
//! longer than the overlap its tail is taken at sentence or word boundaries.
//! Every length is counted in chars, never bytes.

use crate::error::ChunkingError;
use std::collections::VecDeque;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// A chunk of text with its position in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Char offset of the first character in the source
    pub start: usize,
    /// Char offset one past the last character
    pub end: usize,
}

/// Boundaries tried in order, coarsest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    Paragraph,
    Line,
    Sentence,
    Word,
    Char,
}

/// Finest level an overlap tail is cut at; never inside a word
const WORD_LEVEL: usize = 3;

const SEPARATORS: [Separator; 5] = [
    Separator::Paragraph,
    Separator::Line,
    Separator::Sentence,
    Separator::Word,
    Separator::Char,
];

impl Separator {
    /// Split keeping each separator attached to the piece before it, so the
    /// pieces concatenate back to `text`
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Separator::Paragraph => text.split_inclusive("\n\n").collect(),
            Separator::Line => text.split_inclusive('\n').collect(),
            Separator::Sentence => split_after(text, is_sentence_end),
            Separator::Word => split_after(text, |c, _| c.is_whitespace()),
            Separator::Char => text
                .char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect(),
        }
    }
}

fn is_sentence_end(c: char, next: Option<char>) -> bool {
    match c {
        '。' | '！' | '？' | '；' => true,
        '.' | '!' | '?' | ';' => next.is_some_and(char::is_whitespace),
        _ => false,
    }
}

/// Cut after every char matching `is_boundary`, absorbing any whitespace
/// that directly follows the boundary into the same piece
fn split_after(text: &str, is_boundary: impl Fn(char, Option<char>) -> bool) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        let next = chars.peek().map(|&(_, n)| n);
        if !is_boundary(c, next) {
            continue;
        }
        while let Some(&(_, n)) = chars.peek() {
            if !n.is_whitespace() {
                break;
            }
            chars.next();
        }
        let end = chars.peek().map(|&(i, _)| i).unwrap_or(text.len());
        if end > start {
            pieces.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits normalized text into overlapping chunks
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl RecursiveSplitter {
    /// Create a splitter; the overlap must be smaller than the chunk size
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize(
                "chunk size must be greater than 0".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(ChunkingError::InvalidOverlap {
                overlap,
                chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into trimmed, non-empty chunks in document order
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, 0)
    }

    /// Like [`split`](Self::split), also locating each chunk in `text`
    ///
    /// Offsets are found by searching forward from the previous chunk's
    /// start, so repeated passages may resolve to an earlier occurrence.
    pub fn split_with_offsets(&self, text: &str) -> Vec<TextSpan> {
        let chunks = self.split(text);
        let mut spans = Vec::with_capacity(chunks.len());

        // Byte position where the next search begins, and its char offset
        let mut cursor_byte = 0;
        let mut cursor_char = 0;

        for chunk in chunks {
            let len = char_len(&chunk);
            let (start_byte, start_char) = match text[cursor_byte..].find(chunk.as_str()) {
                Some(rel) => {
                    let byte = cursor_byte + rel;
                    (byte, cursor_char + char_len(&text[cursor_byte..byte]))
                }
                None => (cursor_byte, cursor_char),
            };

            spans.push(TextSpan {
                text: chunk,
                start: start_char,
                end: start_char + len,
            });

            // Next chunk starts strictly after this one's first character
            match text[start_byte..].chars().next() {
                Some(c) => {
                    cursor_byte = start_byte + c.len_utf8();
                    cursor_char = start_char + 1;
                }
                None => {
                    cursor_byte = start_byte;
                    cursor_char = start_char;
                }
            }
        }

        spans
    }

    fn split_recursive(&self, text: &str, level: usize) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }

        // Coarsest separator that actually divides the text
        let (sep_level, pieces) = SEPARATORS
            .iter()
            .enumerate()
            .skip(level)
            .map(|(i, sep)| (i, sep.split(text)))
            .find(|(_, pieces)| pieces.len() > 1)
            .unwrap_or_else(|| (SEPARATORS.len() - 1, vec![text]));

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                chunks.extend(self.merge(&fitting, sep_level));
                fitting.clear();
            }
            if sep_level + 1 < SEPARATORS.len() {
                chunks.extend(self.split_recursive(piece, sep_level + 1));
            } else {
                // A single char can never exceed the size, but keep the
                // piece rather than lose text
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge(&fitting, sep_level));
        }

        chunks
    }

    /// Greedily merge small pieces into chunks, carrying the overlap forward
    fn merge<'a>(&self, pieces: &[&'a str], level: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&'a str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                let emitted = push_trimmed(&mut chunks, &window);

                // The carried tail and the new piece must fit one chunk, and
                // the tail never repeats the whole emitted chunk
                let budget = self
                    .overlap
                    .min(self.chunk_size - len)
                    .min(emitted.saturating_sub(1));
                window = overlap_tail(&window, level, budget);
                total = window.iter().map(|(_, l)| l).sum();
            }

            window.push_back((piece, len));
            total += len;
        }

        push_trimmed(&mut chunks, &window);
        chunks
    }
}

/// Trailing text of `window` worth at most `budget` chars
///
/// Whole pieces are kept first; the piece that does not fit contributes its
/// own tail, cut at the next finer separators.
fn overlap_tail<'a>(
    window: &VecDeque<(&'a str, usize)>,
    level: usize,
    budget: usize,
) -> VecDeque<(&'a str, usize)> {
    let mut tail = VecDeque::new();
    let mut used = 0;

    for &(piece, len) in window.iter().rev() {
        if used + len <= budget {
            tail.push_front((piece, len));
            used += len;
            continue;
        }
        for part in piece_tail(piece, level + 1, budget - used).into_iter().rev() {
            tail.push_front((part, char_len(part)));
        }
        break;
    }

    tail
}

/// Trailing sub-pieces of `piece` worth at most `budget` chars, in order
fn piece_tail(piece: &str, level: usize, budget: usize) -> Vec<&str> {
    if budget == 0 || level > WORD_LEVEL {
        return Vec::new();
    }

    let mut reversed = Vec::new();
    let mut used = 0;
    for part in SEPARATORS[level].split(piece).into_iter().rev() {
        let len = char_len(part);
        if used + len <= budget {
            reversed.push(part);
            used += len;
            continue;
        }
        reversed.extend(piece_tail(part, level + 1, budget - used).into_iter().rev());
        break;
    }

    reversed.reverse();
    reversed
}

/// Emit the window as a chunk, returning its length in chars
fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>) -> usize {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        return 0;
    }
    chunks.push(trimmed.to_string());
    char_len(trimmed)
}
