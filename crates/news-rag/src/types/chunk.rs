//! Chunk and index entry types with article back-references

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::article::Article;

/// Fixed metadata stored with every index entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Parent article id
    pub article_id: String,
    /// Parent article title
    pub title: String,
    /// Parent article source name
    pub source: String,
    /// Parent article URL
    pub url: String,
    /// Parent article publication time
    pub published_at: Option<DateTime<Utc>>,
    /// Zero-based chunk index within the article
    pub chunk_index: u32,
}

impl EntryMetadata {
    /// Metadata for chunk `chunk_index` of `article`
    pub fn for_article(article: &Article, chunk_index: u32) -> Self {
        Self {
            article_id: article.id.clone(),
            title: article.title.clone(),
            source: article.source.clone(),
            url: article.url.clone(),
            published_at: article.published_at,
            chunk_index,
        }
    }

    /// Publication date for display, empty when unknown
    pub fn published_label(&self) -> String {
        self.published_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default()
    }
}

/// A contiguous slice of an article's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Character offset (inclusive) in the article content
    pub char_start: usize,
    /// Character offset (exclusive) in the article content
    pub char_end: usize,
    /// Article back-reference and chunk index
    pub metadata: EntryMetadata,
}

impl Chunk {
    /// Zero-based index within the parent article
    pub fn index(&self) -> u32 {
        self.metadata.chunk_index
    }

    /// Attach an embedding, producing the persisted form
    pub fn into_entry(self, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            vector,
            text: self.text,
            metadata: self.metadata,
        }
    }
}

/// The persisted unit of the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
    /// Chunk text
    pub text: String,
    /// Article metadata
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Upsert key: (article id, chunk index)
    pub fn key(&self) -> (String, u32) {
        (self.metadata.article_id.clone(), self.metadata.chunk_index)
    }
}
