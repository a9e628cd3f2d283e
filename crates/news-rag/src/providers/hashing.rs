//! Offline embedder based on signed feature hashing
//!
//! Needs no model download or server, so it backs tests and air-gapped use.
//! Texts sharing vocabulary land close together under cosine similarity;
//! there is no semantic generalization beyond shared tokens.

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Words too common to carry topical signal
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "been", "but", "by", "for", "from",
    "has", "have", "he", "her", "his", "in", "into", "is", "it", "its", "new", "of", "on", "or",
    "s", "said", "she", "that", "the", "their", "they", "this", "to", "was", "were", "what",
    "which", "who", "will", "with",
];

/// Deterministic bag-of-words embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Model identifier reported in stats
    pub const MODEL: &'static str = "feature-hashing-v1";

    /// Create an embedder producing `dimensions`-long vectors
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(Error::config("hashing embedder needs at least one dimension"));
        }
        Ok(Self { dimensions })
    }

    /// Embed synchronously
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let hash = fnv1a(token.as_bytes());
            let slot = (hash % self.dimensions as u64) as usize;
            // Top bit picks the sign so collisions tend to cancel out
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 384 }
    }
}

/// Lowercased alphanumeric tokens minus stopwords
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
}

/// 64-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        Self::MODEL
    }
}
