//! Text chunking
//!
//! Splits document text into overlapping chunks small enough to embed.
//! Offsets are byte offsets and always fall on UTF-8 character boundaries.

use docqa_core::Document;

/// Configuration for document chunking
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum chunk size in bytes
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in bytes
    pub overlap: usize,

    /// Prefer paragraph/sentence/line boundaries over hard cuts
    pub respect_boundaries: bool,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            overlap: 200,
            respect_boundaries: true,
        }
    }
}

impl ChunkConfig {
    /// Create a config with the given size and overlap
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            ..Default::default()
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk content
    pub content: String,

    /// Chunk index within the document
    pub index: u32,

    /// Starting byte offset in the original text
    pub start_offset: usize,

    /// Ending byte offset (exclusive)
    pub end_offset: usize,
}

/// Chunk a loaded document
pub fn chunk_document(doc: &Document, config: &ChunkConfig) -> Vec<TextChunk> {
    chunk_text(&doc.text, config)
}

/// Chunk a text string. Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let mut chunks = Vec::new();

    if text.trim().is_empty() {
        return chunks;
    }

    let chunk_size = config.chunk_size.max(1);
    // Overlap of half a chunk or more would stall progress
    let overlap = config.overlap.min(chunk_size / 2);

    if text.len() <= chunk_size {
        chunks.push(TextChunk {
            content: text.to_string(),
            index: 0,
            start_offset: 0,
            end_offset: text.len(),
        });
        return chunks;
    }

    let mut start = 0;

    while start < text.len() {
        let target = floor_char_boundary(text, (start + chunk_size).min(text.len()));

        let mut end = if target >= text.len() || !config.respect_boundaries {
            target
        } else {
            find_break_point(text, start, target, chunk_size)
        };

        // A single character wider than the chunk size
        if end <= start {
            end = ceil_char_boundary(text, start + 1);
        }

        let content = &text[start..end];
        if !content.trim().is_empty() {
            chunks.push(TextChunk {
                content: content.to_string(),
                index: chunks.len() as u32,
                start_offset: start,
                end_offset: end,
            });
        }

        if end >= text.len() {
            break;
        }

        // Move start with overlap
        let next = floor_char_boundary(text, end.saturating_sub(overlap));
        start = if next > start { next } else { end };
    }

    chunks
}

/// Find a break point at or before `target`, searching back at most a
/// fraction of the chunk so chunks do not shrink to nothing.
fn find_break_point(text: &str, start: usize, target: usize, chunk_size: usize) -> usize {
    let window = (chunk_size / 4).clamp(1, 200);
    let search_start = floor_char_boundary(text, target.saturating_sub(window).max(start + 1));
    if search_start >= target {
        return target;
    }

    let search_text = &text[search_start..target];

    // Look for paragraph break first
    if let Some(pos) = search_text.rfind("\n\n") {
        return search_start + pos + 2;
    }

    // Look for sentence end
    let sentence_end = [". ", "。", "! ", "? "]
        .iter()
        .filter_map(|pattern| search_text.rfind(pattern).map(|pos| pos + pattern.len()))
        .max();
    if let Some(pos) = sentence_end {
        return search_start + pos;
    }

    // Look for line break, then any whitespace
    if let Some(pos) = search_text.rfind('\n') {
        return search_start + pos + 1;
    }
    if let Some(pos) = search_text.rfind(' ') {
        return search_start + pos + 1;
    }

    target
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

// ============================================================================
// Tests
// ============================================================================
