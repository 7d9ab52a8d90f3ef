//! Ragrelay Core Library
//!
//! Retrieval-augmented generation over unreliable LLM providers.
//!
//! # Features
//! - Chat routing across providers with sliding-window rate limits and
//!   failover on rate limits, auth errors, timeouts and malformed replies
//! - Multi-provider embeddings with cooldowns and an opt-in degraded mode
//! - Word-window chunking and document ingestion
//! - Cosine similarity search with keyword and recency fallbacks
//! - Optional LLM reranking and a fingerprint-keyed response cache

pub mod config;
pub mod error;
pub mod failover;
pub mod index;
pub mod llm;
pub mod pipeline;
pub mod providers;
pub mod search;
pub mod state;
pub mod store;

pub use config::{Config, Environment, ProviderConfig};
pub use error::{Error, FailureKind, ProviderFailure, RelayError, Result};
pub use index::{chunk_text, embed_missing, ingest_document, Chunk, EmbedStats};
pub use llm::{
    fingerprint, ChatCompleter, ChatMessage, Embedder, EmbeddingGenerator, EmbeddingOutcome,
    GenerationOptions, GenerationResult, HttpTransport, LlmReranker, MemoryResponseCache,
    MetricsSnapshot, ProviderRouter, ProviderTransport, Reranker, ResponseCache, UsageTracker,
};
pub use pipeline::{Answer, RagPipeline};
pub use providers::{ProviderDescriptor, ProviderRegistry, ProviderShape, RateLimit};
pub use search::{search_knowledge, SearchOptions, SearchResult, SearchSource};
pub use state::OrchestratorState;
pub use store::{KnowledgeChunk, KnowledgeStore, MemoryStore};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "ragrelay";
