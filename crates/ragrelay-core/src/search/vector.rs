//! Vector similarity search
//!
//! Computes cosine similarity between query embedding and stored embeddings.

use super::{SearchResult, SearchSource};
use crate::store::KnowledgeChunk;
use std::cmp::Ordering;

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Score embedded chunks against a query vector.
///
/// Only chunks whose embedding has the query's dimensionality are
/// compared; the pool keeps the `max_pool` most recent of those. Results
/// below `threshold` are dropped, so an empty return means the caller
/// should fall back to lexical search.
pub fn vector_search(
    query: &[f32],
    chunks: &[KnowledgeChunk],
    threshold: f32,
    limit: usize,
    max_pool: usize,
) -> Vec<SearchResult> {
    let mut pool: Vec<&KnowledgeChunk> = chunks
        .iter()
        .filter(|c| c.dimensions() == Some(query.len()))
        .collect();

    if pool.len() > max_pool {
        pool.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pool.truncate(max_pool);
    }

    let mut scored: Vec<(&KnowledgeChunk, f32)> = pool
        .into_iter()
        .filter_map(|chunk| {
            let embedding = chunk.embedding.as_deref()?;
            let sim = cosine_similarity(query, embedding);
            (sim.is_finite() && sim >= threshold).then_some((chunk, sim))
        })
        .collect();

    // Sort by similarity (descending), newest first on ties
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(chunk, sim)| SearchResult::new(chunk.clone(), sim as f64, SearchSource::Vector))
        .collect()
}
