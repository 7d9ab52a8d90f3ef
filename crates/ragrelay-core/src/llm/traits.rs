//! LLM trait definitions

use super::{ChatMessage, GenerationOptions, GenerationResult};
use crate::error::Result;
use async_trait::async_trait;

/// Chat completion across one or more providers
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Generate a completion for the messages
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<GenerationResult>;
}

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text. An error means no vector could
    /// be produced and callers should use lexical search instead.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Document reranking trait
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank documents for a query
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Document for reranking
#[derive(Debug, Clone)]
pub struct RerankDocument {
    pub id: String,
    pub text: String,
}

/// Reranking result
#[derive(Debug, Clone)]
pub struct RerankResult {
    pub id: String,
    pub score: f64,
}
