//! Retrieval-augmented generation pipeline
//!
//! Wires the provider registry, shared orchestrator state, embedding
//! generator, router, reranker, knowledge store and response cache into
//! the operations callers use.

use crate::config::Config;
use crate::error::Result;
use crate::index::{embed_missing, ingest_document, EmbedOptions, EmbedProgress, EmbedStats};
use crate::llm::{
    fingerprint, ChatCompleter, ChatMessage, EmbeddingGenerator, GenerationOptions,
    GenerationResult, HttpTransport, LlmReranker, ProviderRouter, ProviderTransport, Reranker,
    ResponseCache,
};
use crate::providers::ProviderRegistry;
use crate::search::{self, SearchOptions, SearchResult};
use crate::state::OrchestratorState;
use crate::store::{KnowledgeChunk, KnowledgeStore};
use serde::Serialize;
use std::sync::Arc;

/// Generated answer with the chunks it was grounded on
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub result: GenerationResult,
    pub sources: Vec<SearchResult>,
}

pub struct RagPipeline {
    config: Config,
    registry: ProviderRegistry,
    state: Arc<OrchestratorState>,
    router: Arc<ProviderRouter>,
    embeddings: EmbeddingGenerator,
    reranker: LlmReranker,
    store: Arc<dyn KnowledgeStore>,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl RagPipeline {
    /// Build a pipeline over an explicit registry and transport
    pub fn new(
        config: Config,
        registry: ProviderRegistry,
        transport: Arc<dyn ProviderTransport>,
        store: Arc<dyn KnowledgeStore>,
    ) -> Self {
        let state = OrchestratorState::for_registry(&registry);
        let router = Arc::new(ProviderRouter::new(
            &registry,
            &config.router,
            transport.clone(),
            state.clone(),
        ));
        let embeddings = EmbeddingGenerator::new(&registry, &config, transport, state.clone());
        let completer: Arc<dyn ChatCompleter> = router.clone();
        let reranker = LlmReranker::new(completer)
            .with_limits(config.search.rerank_batch, config.search.rerank_text_chars);

        Self {
            config,
            registry,
            state,
            router,
            embeddings,
            reranker,
            store,
            cache: None,
        }
    }

    /// Build a pipeline talking HTTP to the providers enabled by `config`
    pub fn from_config(config: Config, store: Arc<dyn KnowledgeStore>) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config);
        let transport = Arc::new(HttpTransport::new(config.router.attempt_timeout())?);
        Ok(Self::new(config, registry, transport, store))
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn state(&self) -> &Arc<OrchestratorState> {
        &self.state
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    pub fn embeddings(&self) -> &EmbeddingGenerator {
        &self.embeddings
    }

    /// Vector for `text`, or `None` when lexical search must be used
    pub async fn generate_embedding(&self, text: &str) -> Option<Vec<f32>> {
        self.embeddings.generate_embedding(text).await
    }

    /// Top chunks for a query. `threshold` overrides the configured
    /// similarity threshold.
    pub async fn search_knowledge(
        &self,
        query: &str,
        tenant_id: &str,
        limit: usize,
        threshold: Option<f32>,
    ) -> Vec<SearchResult> {
        let mut options = SearchOptions::from_config(&self.config.search).with_limit(limit);
        if let Some(threshold) = threshold {
            options = options.with_threshold(threshold);
        }
        search::search_knowledge(
            self.store.as_ref(),
            &self.embeddings,
            Some(&self.reranker as &dyn Reranker),
            query,
            tenant_id,
            &options,
        )
        .await
    }

    /// Generate through the router, consulting the response cache first
    pub async fn generate_response(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        let cache = self.cache.as_ref().filter(|_| self.config.cache.enabled);
        let key = cache.map(|_| fingerprint(messages));

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            match cache.load_cached_response(key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(provider = %hit.provider_name, "Response cache hit");
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Response cache lookup failed: {}", e),
            }
        }

        let result = self.router.generate_response(messages, options).await?;

        if let (Some(cache), Some(key)) = (cache, key.as_deref()) {
            if let Err(e) = cache
                .store_cached_response(key, &result, self.config.cache.ttl())
                .await
            {
                tracing::warn!("Failed to cache response: {}", e);
            }
        }
        Ok(result)
    }

    /// Retrieve context for `question` and generate a grounded answer
    pub async fn answer(
        &self,
        tenant_id: &str,
        question: &str,
        history: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<Answer> {
        let sources = self
            .search_knowledge(question, tenant_id, self.config.search.default_limit, None)
            .await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(compose_context(&sources)));
        messages.extend(history.iter().filter(|m| !m.is_system()).cloned());
        messages.push(ChatMessage::user(question));

        let result = self.generate_response(&messages, options).await?;
        Ok(Answer { result, sources })
    }

    /// Chunk a document and replace its chunk set
    pub async fn ingest(
        &self,
        tenant_id: &str,
        document_id: &str,
        source_type: &str,
        content: &str,
    ) -> Result<Vec<KnowledgeChunk>> {
        ingest_document(
            self.store.as_ref(),
            tenant_id,
            document_id,
            source_type,
            content,
            &self.config.chunking,
        )
        .await
    }

    /// Embed every chunk of a tenant still missing a vector
    pub async fn embed_missing(
        &self,
        tenant_id: &str,
        progress: Option<Box<dyn Fn(EmbedProgress) + Send + Sync>>,
    ) -> Result<EmbedStats> {
        let options = EmbedOptions {
            delay: self.config.embedding.batch_delay(),
            ..EmbedOptions::default()
        };
        embed_missing(
            self.store.as_ref(),
            &self.embeddings,
            tenant_id,
            &options,
            progress,
        )
        .await
    }
}

fn compose_context(sources: &[SearchResult]) -> String {
    let mut prompt = String::from(
        "You are a support assistant. Answer using the knowledge below. \
         If it does not cover the question, say you do not know.\n",
    );
    if sources.is_empty() {
        prompt.push_str("\nNo knowledge is available for this question.\n");
        return prompt;
    }
    prompt.push_str("\nKnowledge:\n");
    for (i, source) in sources.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, source.chunk.content));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchSource;

    #[test]
    fn test_compose_context_numbers_sources() {
        let chunk = KnowledgeChunk::new("t", "d", 0, "Refunds take 30 days", "faq");
        let sources = vec![SearchResult::new(chunk, 0.9, SearchSource::Keyword)];
        let prompt = compose_context(&sources);
        assert!(prompt.contains("[1] Refunds take 30 days"));
        assert!(compose_context(&[]).contains("No knowledge"));
    }
}
