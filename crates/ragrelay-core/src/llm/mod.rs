//! LLM provider integration
//!
//! Provides:
//! - Chat generation routed across providers with rate-limit failover
//! - Embedding generation with cooldowns and an optional degraded mode
//! - LLM-based reranking
//! - Response cache contract keyed by query fingerprint

mod cache;
mod cooldown;
mod embedder;
mod metrics;
mod reranker;
mod router;
mod traits;
mod transport;
mod types;
mod usage;

pub use cache::{fingerprint, normalize_query, CacheStats, MemoryResponseCache, ResponseCache};
pub use cooldown::CooldownState;
pub use embedder::{degraded_vector, validate_vector, EmbeddingGenerator, EmbeddingOutcome};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use reranker::{LlmReranker, DEFAULT_RERANK_BATCH, DEFAULT_RERANK_TEXT_CHARS};
pub use router::{ProviderRouter, ProviderStatus};
pub use traits::*;
pub use transport::{exchange, HttpTransport, ProviderRequest, ProviderResponse, ProviderTransport};
pub use types::{ChatMessage, Completion, GenerationOptions, GenerationResult};
pub use usage::{UsageSnapshot, UsageTracker};
