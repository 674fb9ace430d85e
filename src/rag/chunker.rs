//! Boundary-aware text chunker
//!
//! Splits document text into overlapping character-sized chunks, preferring
//! paragraph breaks, then sentence breaks, before falling back to a hard cut.
//! Splitting is deterministic: the same text and configuration always yield
//! the same chunk sequence.

use crate::errors::{AgentError, Result};
use serde::{Deserialize, Serialize};

/// A bounded substring of a document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text, at most `chunk_size` characters
    pub text: String,
    /// Byte offset of the chunk within the source document
    pub start_offset: usize,
    /// Position of the chunk in the document's chunk sequence
    pub index: usize,
}

/// Splits text into overlapping chunks
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; `chunk_size` must exceed `overlap`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AgentError::InvalidConfiguration(
                "chunk_size must be positive".to_string(),
            ));
        }
        if overlap >= chunk_size {
            return Err(AgentError::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into chunks
    ///
    /// Empty input yields an empty vector; text shorter than `chunk_size`
    /// yields exactly one chunk containing the full text. Every chunk after
    /// the first starts `overlap` characters before the previous chunk's end.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0usize;

        loop {
            let hard_end = advance_chars(text, start, self.chunk_size);
            if hard_end >= text.len() {
                chunks.push(Chunk {
                    text: text[start..].to_string(),
                    start_offset: start,
                    index,
                });
                break;
            }

            // A boundary is only taken in the back half of the window, so a
            // break right after `start` never produces a sliver chunk.
            let window = &text[start..hard_end];
            let min_break = advance_chars(text, start, self.chunk_size / 2) - start;
            let end = start + find_break(window, min_break).unwrap_or(window.len());

            chunks.push(Chunk {
                text: text[start..end].to_string(),
                start_offset: start,
                index,
            });
            index += 1;

            let next = retreat_chars(text, end, self.overlap);
            // Guarantee forward progress even when the overlap would swallow
            // the entire previous chunk.
            start = if next > start { next } else { end };
        }

        chunks
    }
}

/// Best split position within `window`, honoring boundary priority:
/// paragraph break, then sentence break. Returns the end offset of the
/// boundary (relative to the window), or None for a hard cut.
fn find_break(window: &str, min_break: usize) -> Option<usize> {
    if let Some(pos) = window.rfind("\n\n") {
        let end = pos + 2;
        if end >= min_break {
            return Some(end);
        }
    }

    let mut best: Option<usize> = None;
    for pat in [". ", "! ", "? ", "\n"] {
        if let Some(pos) = window.rfind(pat) {
            let end = pos + pat.len();
            if end >= min_break && best.map_or(true, |b| end > b) {
                best = Some(end);
            }
        }
    }
    best
}

/// Byte offset after advancing `count` characters from `from`
fn advance_chars(text: &str, from: usize, count: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(count)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte offset `count` characters before `from`
fn retreat_chars(text: &str, from: usize, count: usize) -> usize {
    if count == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(count - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 100).is_err());
        assert!(TextChunker::new(100, 150).is_err());
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let chunker = TextChunker::new(100, 20).unwrap();
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn test_short_text_yields_single_chunk() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let chunks = chunker.split("short policy note");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short policy note");
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_exact_overlap_on_boundary_free_text() {
        let text = "a".repeat(250);
        let chunker = TextChunker::new(100, 20).unwrap();
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let prev_tail = &pair[0].text[pair[0].text.len() - 20..];
            let next_head = &pair[1].text[..20];
            assert_eq!(prev_tail, next_head);
        }
    }

    #[test]
    fn test_prefers_paragraph_break() {
        let mut text = "x".repeat(70);
        text.push_str("\n\n");
        text.push_str(&"y".repeat(60));

        let chunker = TextChunker::new(100, 0).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with("\n\n"));
        assert!(chunks[1].text.chars().all(|c| c == 'y'));
    }

    #[test]
    fn test_prefers_sentence_break_over_hard_cut() {
        let mut text = "w".repeat(70);
        text.push_str(". ");
        text.push_str(&"z".repeat(60));

        let chunker = TextChunker::new(100, 0).unwrap();
        let chunks = chunker.split(&text);

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with(". "));
    }

    #[test]
    fn test_start_offsets_match_source() {
        let text = "First paragraph about returns.\n\nSecond paragraph about refunds.\n\nThird paragraph about exchanges and shipping labels.";
        let chunker = TextChunker::new(40, 10).unwrap();
        let chunks = chunker.split(text);

        for chunk in &chunks {
            let slice = &text[chunk.start_offset..chunk.start_offset + chunk.text.len()];
            assert_eq!(slice, chunk.text);
        }
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let text = "déjà vu ".repeat(40);
        let chunker = TextChunker::new(50, 10).unwrap();
        let chunks = chunker.split(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 50);
        }
    }

    #[quickcheck]
    fn prop_split_is_deterministic(text: String) -> bool {
        let chunker = TextChunker::new(80, 16).unwrap();
        chunker.split(&text) == chunker.split(&text)
    }

    #[quickcheck]
    fn prop_chunks_respect_size_bound(text: String) -> bool {
        let chunker = TextChunker::new(64, 8).unwrap();
        chunker
            .split(&text)
            .iter()
            .all(|c| c.text.chars().count() <= 64)
    }

    #[quickcheck]
    fn prop_chunks_are_nonempty_and_ordered(text: String) -> bool {
        let chunker = TextChunker::new(64, 8).unwrap();
        let chunks = chunker.split(&text);
        chunks.iter().enumerate().all(|(i, c)| c.index == i)
            && chunks.iter().all(|c| !c.text.is_empty())
            && chunks.windows(2).all(|p| p[0].start_offset < p[1].start_offset)
    }
}
