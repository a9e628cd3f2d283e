//! Result types for retrieval, answering and ingestion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chunk::IndexEntry;

/// Fixed answer when the collection holds no entries
pub const NO_DATA_ANSWER: &str =
    "No news articles have been indexed yet. Please fetch and index some articles first.";

/// Fixed answer when retrieval found nothing relevant
pub const NO_RESULTS_ANSWER: &str =
    "No relevant articles found for your query. Try a different search term.";

/// One retrieval hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEntry {
    /// The matched entry
    pub entry: IndexEntry,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Source attribution for an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Article title
    pub title: String,
    /// Source name
    pub source: String,
    /// Article URL
    pub url: String,
    /// Publication time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl SourceRef {
    /// Distinct (title, source, url) triples in first-seen order
    pub fn dedup_from(hits: &[ScoredEntry]) -> Vec<SourceRef> {
        let mut sources: Vec<SourceRef> = Vec::new();
        for hit in hits {
            let meta = &hit.entry.metadata;
            let seen = sources
                .iter()
                .any(|s| s.title == meta.title && s.source == meta.source && s.url == meta.url);
            if !seen {
                sources.push(SourceRef {
                    title: meta.title.clone(),
                    source: meta.source.clone(),
                    url: meta.url.clone(),
                    published_at: meta.published_at,
                });
            }
        }
        sources
    }

    /// Format for display in text
    pub fn format_inline(&self) -> String {
        format!("{} ({}) <{}>", self.title, self.source, self.url)
    }
}

/// How an answer was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// Generated by the backend from retrieved context
    Answered,
    /// Collection is empty
    NoData,
    /// Retrieval returned nothing
    NoResults,
}

/// Response to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text
    pub text: String,
    /// Deduplicated sources of the retrieved context
    pub sources: Vec<SourceRef>,
    /// Outcome
    pub status: AnswerStatus,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl Answer {
    /// Create a generated answer
    pub fn new(text: String, hits: &[ScoredEntry], processing_time_ms: u64) -> Self {
        Self {
            text,
            sources: SourceRef::dedup_from(hits),
            status: AnswerStatus::Answered,
            chunks_retrieved: hits.len(),
            processing_time_ms,
        }
    }

    /// Fixed response for an empty collection
    pub fn no_data(processing_time_ms: u64) -> Self {
        Self::fixed(NO_DATA_ANSWER, AnswerStatus::NoData, processing_time_ms)
    }

    /// Fixed response when nothing relevant was retrieved
    pub fn no_results(processing_time_ms: u64) -> Self {
        Self::fixed(NO_RESULTS_ANSWER, AnswerStatus::NoResults, processing_time_ms)
    }

    fn fixed(text: &str, status: AnswerStatus, processing_time_ms: u64) -> Self {
        Self {
            text: text.to_string(),
            sources: Vec::new(),
            status,
            chunks_retrieved: 0,
            processing_time_ms,
        }
    }

    /// True if the backend produced the text
    pub fn is_generated(&self) -> bool {
        self.status == AnswerStatus::Answered
    }
}

/// Why an article was not indexed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Content empty or whitespace
    EmptyContent,
    /// Same id appeared earlier in the batch
    DuplicateInBatch,
    /// Embedding the article's chunks failed
    EmbeddingFailed(String),
}

/// An article left out of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedArticle {
    /// Article id
    pub article_id: String,
    /// Article title
    pub title: String,
    /// Reason
    pub reason: SkipReason,
}

/// Summary of an ingestion batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Articles written to the index
    pub articles_indexed: usize,
    /// Chunks written to the index
    pub chunks_indexed: usize,
    /// Stale chunks removed from re-indexed articles
    pub chunks_pruned: usize,
    /// Articles skipped, with reasons
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedArticle>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl IngestReport {
    /// True if every article was indexed
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Vector index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Collection name
    pub collection: String,
    /// Number of entries
    pub entry_count: usize,
    /// Vector dimensionality
    pub dimensions: usize,
    /// Similarity metric
    pub metric: String,
}

/// Generation backend readiness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum BackendStatus {
    /// Reachable with the model installed
    Ready(String),
    /// Reachable but the model is not installed
    ModelMissing(String),
    /// Not reachable
    Unreachable(String),
}

impl BackendStatus {
    /// True if generation requests should succeed
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            Self::Ready(m) | Self::ModelMissing(m) | Self::Unreachable(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk::EntryMetadata;

    fn hit(title: &str, source: &str, url: &str, chunk_index: u32, similarity: f32) -> ScoredEntry {
        ScoredEntry {
            entry: IndexEntry {
                vector: Vec::new(),
                text: format!("{} chunk {}", title, chunk_index),
                metadata: EntryMetadata {
                    article_id: url.to_string(),
                    title: title.to_string(),
                    source: source.to_string(),
                    url: url.to_string(),
                    published_at: None,
                    chunk_index,
                },
            },
            similarity,
        }
    }

    #[test]
    fn test_sources_deduplicated_in_first_seen_order() {
        let hits = vec![
            hit("B", "Wire", "https://b", 0, 0.9),
            hit("A", "Daily", "https://a", 1, 0.8),
            hit("B", "Wire", "https://b", 2, 0.7),
            hit("A", "Daily", "https://a", 0, 0.6),
        ];
        let sources = SourceRef::dedup_from(&hits);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title, "B");
        assert_eq!(sources[1].title, "A");
    }

    #[test]
    fn test_fixed_answers() {
        let none = Answer::no_data(3);
        assert_eq!(none.text, NO_DATA_ANSWER);
        assert_eq!(none.status, AnswerStatus::NoData);
        assert!(none.sources.is_empty());
        assert!(!none.is_generated());

        let miss = Answer::no_results(1);
        assert_eq!(miss.text, NO_RESULTS_ANSWER);
        assert_eq!(miss.chunks_retrieved, 0);
    }

    #[test]
    fn test_skip_reason_serialization() {
        let skipped = SkippedArticle {
            article_id: "abc".to_string(),
            title: "Empty".to_string(),
            reason: SkipReason::EmptyContent,
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["reason"], "empty_content");
        assert_eq!(json["article_id"], "abc");
    }
}
