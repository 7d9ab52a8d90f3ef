//! Knowledge retrieval
//!
//! Provides:
//! - Cosine similarity search over tenant chunk embeddings
//! - Keyword fallback with recency weighting
//! - Optional LLM reranking of the final candidates

mod keyword;
mod knowledge;
mod vector;

pub use keyword::{extract_tokens, keyword_search, recent_chunks};
pub use knowledge::{rerank_results, search_knowledge};
pub use vector::{cosine_similarity, vector_search};

use crate::config::SearchConfig;
use crate::store::KnowledgeChunk;
use serde::Serialize;

/// Search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Minimum cosine similarity for vector results (0.0 - 1.0)
    pub threshold: f32,
    /// Upper bound on embedded chunks scored per query
    pub max_candidate_pool: usize,
    /// Rerank the final candidates when a reranker is available
    pub rerank: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            limit: config.default_limit,
            threshold: config.similarity_threshold,
            max_candidate_pool: config.max_candidate_pool,
            rerank: config.rerank,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: KnowledgeChunk,
    /// Retrieval score in [0, 1]
    pub score: f64,
    pub source: SearchSource,
    /// Score assigned by the reranker, when reranking ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f64>,
    /// Position assigned by the reranker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rerank_position: Option<usize>,
}

impl SearchResult {
    pub fn new(chunk: KnowledgeChunk, score: f64, source: SearchSource) -> Self {
        Self {
            chunk,
            score: score.clamp(0.0, 1.0),
            source,
            rerank_score: None,
            rerank_position: None,
        }
    }

    /// Score the result list is ordered by
    pub fn relevance(&self) -> f64 {
        self.rerank_score.unwrap_or(self.score)
    }
}

/// Source of search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Vector,
    Keyword,
    /// Most recent chunks, used when the query has no usable terms
    Recent,
}

impl SearchSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Keyword => "keyword",
            Self::Recent => "recent",
        }
    }
}

/// Common English stop words to remove from natural language queries
pub(crate) const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
    "has", "have", "he", "in", "is", "it", "its", "of", "on", "that",
    "the", "to", "was", "will", "with", "does", "do", "did", "can",
    "could", "should", "would", "what", "where", "when", "why", "how",
    "who", "which", "this", "these", "those", "there", "here", "you",
    "your", "our", "not", "but", "all", "any", "about", "into",
];

/// Recency of a timestamp relative to the newest and oldest chunk, in [0, 1]
pub(crate) fn recency_weight(chunk: &KnowledgeChunk, oldest: i64, newest: i64) -> f64 {
    if newest <= oldest {
        return 1.0;
    }
    let ts = chunk.created_at.timestamp_millis();
    ((ts - oldest) as f64 / (newest - oldest) as f64).clamp(0.0, 1.0)
}

/// Oldest and newest creation time (epoch millis) in a chunk set
pub(crate) fn time_bounds(chunks: &[KnowledgeChunk]) -> (i64, i64) {
    chunks
        .iter()
        .map(|c| c.created_at.timestamp_millis())
        .fold((i64::MAX, i64::MIN), |(lo, hi), ts| (lo.min(ts), hi.max(ts)))
}
