//! Fixed-window text chunking with character overlap
//!
//! Lengths and offsets are counted in Unicode scalar values, never bytes, so
//! multi-byte text is never split inside a character.

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Article, Chunk, EntryMetadata};

/// A window into the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    /// Character offset (inclusive)
    pub start: usize,
    /// Character offset (exclusive)
    pub end: usize,
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk length in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker; requires `overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Self::from_config(&ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        })
    }

    /// Maximum chunk length
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap length
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance between consecutive chunk starts
    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }

    /// Compute chunk windows over a text of `len` characters
    ///
    /// Window `i` starts at `i * (size - overlap)`; all windows but the last
    /// are exactly `size` long.
    pub fn spans(&self, len: usize) -> Vec<Span> {
        let mut spans = Vec::new();
        if len == 0 {
            return spans;
        }

        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(len);
            spans.push(Span { start, end });
            if end == len {
                break;
            }
            start += self.stride();
        }
        spans
    }

    /// Split text into overlapping chunks
    pub fn split_text<'a>(&self, text: &'a str) -> Vec<(Span, &'a str)> {
        // Byte offset of every char, plus the end of the string
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_count = offsets.len();
        offsets.push(text.len());

        self.spans(char_count)
            .into_iter()
            .map(|span| (span, &text[offsets[span.start]..offsets[span.end]]))
            .collect()
    }

    /// Chunk an article's content, attaching its metadata
    pub fn chunk_article(&self, article: &Article) -> Vec<Chunk> {
        self.split_text(&article.content)
            .into_iter()
            .enumerate()
            .map(|(i, (span, text))| Chunk {
                text: text.to_string(),
                char_start: span.start,
                char_end: span.end,
                metadata: EntryMetadata::for_article(article, i as u32),
            })
            .collect()
    }

    /// Rebuild the original text from consecutive chunks
    pub fn reassemble<S: AsRef<str>>(&self, chunks: &[S]) -> String {
        let mut text = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let chunk = chunk.as_ref();
            if i == 0 {
                text.push_str(chunk);
            } else {
                text.extend(chunk.chars().skip(self.overlap));
            }
        }
        text
    }
}
