//! Document ingestion and bulk re-embedding

use super::chunker::chunk_text;
use crate::config::ChunkingConfig;
use crate::error::{RelayError, Result};
use crate::llm::{EmbeddingGenerator, EmbeddingOutcome};
use crate::store::{KnowledgeChunk, KnowledgeStore};
use chrono::Utc;
use std::collections::HashSet;
use std::time::Duration;

const BATCH_SIZE: usize = 32;

/// Embedding progress
#[derive(Debug, Clone)]
pub struct EmbedProgress {
    pub processed_chunks: usize,
    pub embedded_chunks: usize,
    pub failed_chunks: usize,
}

/// Embedding statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedStats {
    pub embedded_chunks: usize,
    /// Chunks whose vector the store rejected
    pub failed_chunks: usize,
    /// Stopped early because no provider could embed
    pub halted: bool,
}

/// Bulk embedding options
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    pub batch_size: usize,
    /// Pause between consecutive provider calls
    pub delay: Duration,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            delay: Duration::from_millis(250),
        }
    }
}

/// Split a document and replace its chunk set in the store.
///
/// Returned chunks carry no embedding; run [`embed_missing`] afterwards.
pub async fn ingest_document(
    store: &dyn KnowledgeStore,
    tenant_id: &str,
    document_id: &str,
    source_type: &str,
    content: &str,
    chunking: &ChunkingConfig,
) -> Result<Vec<KnowledgeChunk>> {
    if tenant_id.is_empty() || document_id.is_empty() {
        return Err(RelayError::InvalidInput(
            "tenant and document ids are required".to_string(),
        ));
    }

    let created_at = Utc::now();
    let chunks: Vec<KnowledgeChunk> = chunk_text(content, chunking.max_words, chunking.overlap)
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            KnowledgeChunk::new(tenant_id, document_id, index, chunk.text, source_type)
                .with_created_at(created_at)
        })
        .collect();

    store
        .replace_document_chunks(tenant_id, document_id, chunks.clone())
        .await?;

    tracing::info!(
        tenant = tenant_id,
        document = document_id,
        chunks = chunks.len(),
        "Ingested document"
    );
    Ok(chunks)
}

/// Embed every chunk of a tenant that still lacks a vector.
///
/// Safe to rerun: each pass selects whatever is still missing. Stops as
/// soon as no provider can embed; degraded vectors are never persisted.
pub async fn embed_missing(
    store: &dyn KnowledgeStore,
    generator: &EmbeddingGenerator,
    tenant_id: &str,
    options: &EmbedOptions,
    progress: Option<Box<dyn Fn(EmbedProgress) + Send + Sync>>,
) -> Result<EmbedStats> {
    let batch_size = options.batch_size.max(1);
    let mut stats = EmbedStats::default();
    let mut rejected: HashSet<String> = HashSet::new();
    let mut calls = 0usize;

    'outer: loop {
        let batch: Vec<KnowledgeChunk> = store
            .chunks_missing_embedding(tenant_id, batch_size + rejected.len())
            .await?
            .into_iter()
            .filter(|c| !rejected.contains(&c.id))
            .take(batch_size)
            .collect();

        if batch.is_empty() {
            break;
        }

        for chunk in batch {
            if calls > 0 && !options.delay.is_zero() {
                tokio::time::sleep(options.delay).await;
            }
            calls += 1;

            match generator.generate(&chunk.content).await {
                EmbeddingOutcome::Provider { vector, provider } => {
                    match store.persist_chunk_embedding(&chunk, &vector).await {
                        Ok(()) => {
                            stats.embedded_chunks += 1;
                            tracing::debug!(chunk = %chunk.id, %provider, "Embedded chunk");
                        }
                        Err(e @ RelayError::DimensionMismatch { .. }) => {
                            tracing::warn!(chunk = %chunk.id, %provider, "Rejected embedding: {}", e);
                            stats.failed_chunks += 1;
                            rejected.insert(chunk.id.clone());
                        }
                        Err(e) => return Err(e),
                    }
                }
                EmbeddingOutcome::Degraded(_) | EmbeddingOutcome::Unavailable => {
                    tracing::warn!(
                        tenant = tenant_id,
                        embedded = stats.embedded_chunks,
                        "No embedding provider available, stopping"
                    );
                    stats.halted = true;
                    break 'outer;
                }
            }

            if let Some(ref cb) = progress {
                cb(EmbedProgress {
                    processed_chunks: stats.embedded_chunks + stats.failed_chunks,
                    embedded_chunks: stats.embedded_chunks,
                    failed_chunks: stats.failed_chunks,
                });
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_ingest_replaces_document() {
        let store = MemoryStore::new();
        let chunking = ChunkingConfig {
            max_words: 3,
            overlap: 1,
        };

        let first = ingest_document(&store, "t", "doc", "upload", "a b c d e", &chunking)
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].metadata.index, 1);
        assert_eq!(first[1].content, "c d e");

        ingest_document(&store, "t", "doc", "upload", "x y", &chunking)
            .await
            .unwrap();
        let chunks = store.load_tenant_chunks("t").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "x y");
    }

    #[tokio::test]
    async fn test_ingest_requires_ids() {
        let store = MemoryStore::new();
        let result =
            ingest_document(&store, "", "doc", "upload", "text", &ChunkingConfig::default()).await;
        assert!(result.is_err());
    }
}
