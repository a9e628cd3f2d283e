//! News article records supplied by the ingestion collaborator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A fetched news article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Stable id: hex SHA-256 of the URL
    pub id: String,
    /// Headline
    pub title: String,
    /// Full text content (what gets chunked)
    pub content: String,
    /// Short summary from the feed
    pub summary: String,
    /// Source name, e.g. "BBC World"
    pub source: String,
    /// Canonical URL
    pub url: String,
    /// Publication timestamp, when the feed provides one
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Create an article, deriving its id from the URL
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        summary: impl Into<String>,
        source: impl Into<String>,
        url: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        let url = url.into();
        Self {
            id: Self::id_for_url(&url),
            title: title.into(),
            content: content.into(),
            summary: summary.into(),
            source: source.into(),
            url,
            published_at,
        }
    }

    /// Article id for a URL
    pub fn id_for_url(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// True if there is nothing to index
    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }
}
