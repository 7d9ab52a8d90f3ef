//! Retrieval entry point: vector search with lexical fallbacks

use super::keyword::{extract_tokens, keyword_search, recent_chunks};
use super::vector::vector_search;
use super::{SearchOptions, SearchResult};
use crate::failover::{first_success, Attempt, AttemptError};
use crate::llm::{Embedder, RerankDocument, Reranker};
use crate::store::{KnowledgeChunk, KnowledgeStore};
use std::collections::HashMap;
use std::time::Instant;

/// Top chunks for a query within one tenant.
///
/// Runs vector search first and falls back to keyword matching when the
/// query cannot be embedded, no chunk carries a comparable embedding, or
/// nothing clears the threshold. A query with no usable terms returns the
/// most recent chunks. Never fails: storage errors yield an empty list.
pub async fn search_knowledge(
    store: &dyn KnowledgeStore,
    embedder: &dyn Embedder,
    reranker: Option<&dyn Reranker>,
    query: &str,
    tenant_id: &str,
    options: &SearchOptions,
) -> Vec<SearchResult> {
    if options.limit == 0 {
        return Vec::new();
    }
    let started = Instant::now();

    let chunks = match store.load_tenant_chunks(tenant_id).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(tenant = tenant_id, "Failed to load knowledge chunks: {}", e);
            return Vec::new();
        }
    };
    if chunks.is_empty() {
        tracing::debug!(tenant = tenant_id, "No knowledge chunks for tenant");
        return Vec::new();
    }

    let chunks = &chunks;
    let attempts: Vec<Attempt<'_, Vec<SearchResult>, String>> = vec![
        Attempt::new("vector", move || async move {
            vector_attempt(embedder, query, chunks, options).await
        }),
        Attempt::new("keyword", move || async move {
            let tokens = extract_tokens(query);
            if tokens.is_empty() {
                return Err(AttemptError::Skipped("no usable query terms".to_string()));
            }
            let results = keyword_search(&tokens, chunks, options.limit);
            if results.is_empty() {
                Err(AttemptError::Failed("no chunk matched any term".to_string()))
            } else {
                Ok(results)
            }
        }),
        Attempt::new("recent", move || async move {
            Ok(recent_chunks(chunks, options.limit))
        }),
    ];

    let (source, results) = match first_success("retrieval", attempts).await {
        Ok(success) => (success.name, success.value),
        Err(_) => return Vec::new(),
    };

    let results = match reranker {
        Some(reranker) if options.rerank && results.len() > 1 => {
            rerank_results(reranker, query, results).await
        }
        _ => results,
    };

    tracing::debug!(
        tenant = tenant_id,
        %source,
        results = results.len(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Knowledge search complete"
    );
    results
}

async fn vector_attempt(
    embedder: &dyn Embedder,
    query: &str,
    chunks: &[KnowledgeChunk],
    options: &SearchOptions,
) -> Result<Vec<SearchResult>, AttemptError<String>> {
    if !chunks.iter().any(KnowledgeChunk::has_embedding) {
        return Err(AttemptError::Skipped("no embedded chunks".to_string()));
    }

    let query_embedding = embedder
        .embed(query)
        .await
        .map_err(|e| AttemptError::Failed(format!("query embedding unavailable: {}", e)))?;

    if !chunks
        .iter()
        .any(|c| c.dimensions() == Some(query_embedding.len()))
    {
        return Err(AttemptError::Failed(format!(
            "no chunk embeddings with {} dimensions",
            query_embedding.len()
        )));
    }

    let results = vector_search(
        &query_embedding,
        chunks,
        options.threshold,
        options.limit,
        options.max_candidate_pool,
    );
    if results.is_empty() {
        Err(AttemptError::Failed(format!(
            "nothing above threshold {}",
            options.threshold
        )))
    } else {
        Ok(results)
    }
}

/// Reorder results by reranker score.
///
/// The reranker only scores a leading batch; the rest keep their order
/// after it with scores capped at the lowest reranked score, so relevance
/// stays non-increasing. Any reranker failure returns `results` unchanged.
pub async fn rerank_results(
    reranker: &dyn Reranker,
    query: &str,
    results: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let documents: Vec<RerankDocument> = results
        .iter()
        .enumerate()
        .map(|(i, r)| RerankDocument {
            id: (i + 1).to_string(),
            text: r.chunk.content.clone(),
        })
        .collect();

    let scores: HashMap<String, f64> = match reranker.rerank(query, &documents).await {
        Ok(scored) if !scored.is_empty() => scored
            .into_iter()
            .map(|r| (r.id, r.score.clamp(0.0, 1.0)))
            .collect(),
        Ok(_) => return results,
        Err(e) => {
            tracing::info!(model = reranker.model_name(), "Reranking failed, keeping order: {}", e);
            return results;
        }
    };

    let mut head: Vec<(f64, SearchResult)> = Vec::new();
    let mut tail: Vec<SearchResult> = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        match scores.get(&(i + 1).to_string()) {
            Some(&score) => head.push((score, result)),
            None => tail.push(result),
        }
    }

    // Stable sort keeps retrieval order for equal scores
    head.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let floor = head.last().map(|(s, _)| *s).unwrap_or(0.0);

    let mut reranked: Vec<SearchResult> = head
        .into_iter()
        .enumerate()
        .map(|(position, (score, mut result))| {
            result.rerank_score = Some(score);
            result.rerank_position = Some(position);
            result
        })
        .collect();
    reranked.extend(tail.into_iter().map(|mut result| {
        result.rerank_score = Some(result.score.min(floor));
        result
    }));
    reranked
}
