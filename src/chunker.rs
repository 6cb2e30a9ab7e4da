//! Splitting document pages into bounded chunks.

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// Configuration for text chunking.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub max_chars: usize,
    /// Overlap between consecutive chunks of the same page.
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap: 0,
        }
    }
}

/// A bounded span of page text with its origin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Chunk text content.
    pub text: String,
    /// Page the chunk was taken from (1-indexed).
    pub page: usize,
    /// Source document name.
    pub source: String,
    /// Position of the chunk within the document.
    pub index: usize,
}

/// Split every page of `document` into chunks. Chunks never span pages.
pub fn chunk_document(document: &Document, source: &str, config: &ChunkConfig) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for page in &document.pages {
        for text in split_text(&page.content, config) {
            chunks.push(Chunk {
                text,
                page: page.number,
                source: source.to_string(),
                index: chunks.len(),
            });
        }
    }

    chunks
}

/// Split text into pieces of at most `max_chars` characters, preferring to
/// break after a sentence end in the last 100 characters of a window.
pub fn split_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let mut pieces = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let text_len = chars.len();
    let max_chars = config.max_chars.max(1);

    if text_len == 0 {
        return pieces;
    }

    let mut start = 0;

    while start < text_len {
        let end = (start + max_chars).min(text_len);

        let adjusted_end = if end < text_len {
            let search_start = end.saturating_sub(100).max(start);
            chars[search_start..end]
                .iter()
                .rposition(|&c| c == '.' || c == '!' || c == '?')
                .map(|pos| search_start + pos + 1)
                .filter(|&candidate| candidate > start)
                .unwrap_or(end)
        } else {
            end
        };

        let piece: String = chars[start..adjusted_end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            pieces.push(piece.to_string());
        }

        if adjusted_end >= text_len {
            break;
        }

        let next_start = adjusted_end.saturating_sub(config.overlap);
        start = if next_start <= start {
            adjusted_end
        } else {
            next_start
        };
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Page;

    #[test]
    fn test_split_respects_max_chars() {
        let text = "This is a test. Another sentence here. And one more.";
        let config = ChunkConfig {
            max_chars: 20,
            overlap: 0,
        };

        let pieces = split_text(text, &config);
        assert!(pieces.len() >= 3);
        for piece in &pieces {
            assert!(!piece.is_empty());
            assert!(piece.chars().count() <= 20);
        }
        assert_eq!(pieces[0], "This is a test.");
    }

    #[test]
    fn test_split_short_text_single_piece() {
        let pieces = split_text("Short page.", &ChunkConfig::default());
        assert_eq!(pieces, vec!["Short page."]);
    }

    #[test]
    fn test_split_without_sentence_end() {
        let text = "a".repeat(25);
        let config = ChunkConfig {
            max_chars: 10,
            overlap: 0,
        };
        let pieces = split_text(&text, &config);
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].len(), 5);
    }

    #[test]
    fn test_overlap_makes_progress() {
        let text = "b".repeat(30);
        let config = ChunkConfig {
            max_chars: 10,
            overlap: 15,
        };
        let pieces = split_text(&text, &config);
        assert_eq!(pieces.len(), 3);
    }

    #[test]
    fn test_overlap_repeats_tail_of_previous_piece() {
        let config = ChunkConfig {
            max_chars: 10,
            overlap: 3,
        };
        let pieces = split_text("abcdefghijklmnopqrst", &config);
        assert_eq!(pieces, vec!["abcdefghij", "hijklmnopq", "opqrst"]);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_text("", &ChunkConfig::default()).is_empty());
    }

    #[test]
    fn test_chunks_keep_page_and_source() {
        let doc = Document::new(
            "survey",
            vec![
                Page::new(2, "Page two text.".to_string()),
                Page::new(4, "Page four text.".to_string()),
            ],
        );
        let chunks = chunk_document(&doc, "survey", &ChunkConfig::default());

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, 2);
        assert_eq!(chunks[1].page, 4);
        assert_eq!(chunks[1].index, 1);
        assert!(chunks.iter().all(|c| c.source == "survey"));
    }
}
