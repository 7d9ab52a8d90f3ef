//! Lexical fallback search

use super::{recency_weight, time_bounds, SearchResult, SearchSource, STOP_WORDS};
use crate::store::KnowledgeChunk;
use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"[\p{L}\p{M}\p{N}]+").unwrap();
}

const MATCH_WEIGHT: f64 = 0.8;
const RECENCY_WEIGHT: f64 = 0.2;

/// Lowercase letter/digit runs in any script longer than two characters,
/// with stop words removed and duplicates dropped (first occurrence wins)
pub fn extract_tokens(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut tokens: Vec<String> = Vec::new();
    for m in TOKEN_RE.find_iter(&lowered) {
        let token = m.as_str();
        if token.chars().count() > 2
            && !STOP_WORDS.contains(&token)
            && !tokens.iter().any(|t| t == token)
        {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Chunks containing at least one token, scored by the share of tokens
/// matched and weighted by recency
pub fn keyword_search(tokens: &[String], chunks: &[KnowledgeChunk], limit: usize) -> Vec<SearchResult> {
    if tokens.is_empty() {
        return Vec::new();
    }
    let (oldest, newest) = time_bounds(chunks);

    let mut scored: Vec<(&KnowledgeChunk, f64)> = chunks
        .iter()
        .filter_map(|chunk| {
            let content = chunk.content.to_lowercase();
            let matches = tokens.iter().filter(|t| content.contains(t.as_str())).count();
            if matches == 0 {
                return None;
            }
            let match_ratio = matches as f64 / tokens.len() as f64;
            let score = match_ratio * MATCH_WEIGHT
                + recency_weight(chunk, oldest, newest) * RECENCY_WEIGHT;
            Some((chunk, score))
        })
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(chunk, score)| SearchResult::new(chunk.clone(), score, SearchSource::Keyword))
        .collect()
}

/// Most recently created chunks, newest first
pub fn recent_chunks(chunks: &[KnowledgeChunk], limit: usize) -> Vec<SearchResult> {
    let (oldest, newest) = time_bounds(chunks);
    let mut sorted: Vec<&KnowledgeChunk> = chunks.iter().collect();
    sorted.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.metadata.index.cmp(&b.metadata.index))
    });

    sorted
        .into_iter()
        .take(limit)
        .map(|chunk| {
            let score = recency_weight(chunk, oldest, newest) * RECENCY_WEIGHT;
            SearchResult::new(chunk.clone(), score, SearchSource::Recent)
        })
        .collect()
}
