//! Knowledge storage contract
//!
//! The persistent store is an external collaborator. Retrieval and
//! ingestion only talk to it through [`KnowledgeStore`].

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form chunk metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Where the document came from (upload, url, faq, ...)
    pub source_type: String,
    /// Ordinal position of the chunk within its document
    pub index: usize,
}

/// A segment of a tenant document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub document_id: String,
    pub tenant_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeChunk {
    /// Create a chunk without an embedding. The id is derived from the
    /// owning tenant, document, position and content.
    pub fn new(
        tenant_id: impl Into<String>,
        document_id: impl Into<String>,
        index: usize,
        content: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        let document_id = document_id.into();
        let content = content.into();
        Self {
            id: chunk_id(&tenant_id, &document_id, index, &content),
            document_id,
            tenant_id,
            content,
            embedding: None,
            metadata: ChunkMetadata {
                source_type: source_type.into(),
                index,
            },
            created_at: Utc::now(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.embedding.as_ref().map(Vec::len).filter(|&d| d > 0)
    }
}

/// Content-addressed chunk id
pub fn chunk_id(tenant_id: &str, document_id: &str, index: usize, content: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(document_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(index as u64).to_le_bytes());
    hasher.update(content.as_bytes());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..32].to_string()
}

/// Storage operations used by retrieval and ingestion
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// All chunks owned by a tenant
    async fn load_tenant_chunks(&self, tenant_id: &str) -> Result<Vec<KnowledgeChunk>>;

    /// Set a chunk's embedding. Fails with `DimensionMismatch` when the
    /// tenant already holds embeddings of another length.
    async fn persist_chunk_embedding(&self, chunk: &KnowledgeChunk, vector: &[f32]) -> Result<()>;

    /// Chunks of a tenant still lacking an embedding, oldest first
    async fn chunks_missing_embedding(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeChunk>>;

    /// Replace every chunk of a document with a new set
    async fn replace_document_chunks(
        &self,
        tenant_id: &str,
        document_id: &str,
        chunks: Vec<KnowledgeChunk>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_content_addressed() {
        let a = KnowledgeChunk::new("t1", "doc", 0, "hello", "upload");
        let b = KnowledgeChunk::new("t1", "doc", 0, "hello", "upload");
        let c = KnowledgeChunk::new("t2", "doc", 0, "hello", "upload");
        let d = KnowledgeChunk::new("t1", "doc", 1, "hello", "upload");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_ne!(a.id, d.id);
        assert_eq!(a.id.len(), 32);
    }

    #[test]
    fn test_dimensions() {
        let chunk = KnowledgeChunk::new("t", "d", 0, "x", "faq");
        assert!(!chunk.has_embedding());
        assert_eq!(chunk.dimensions(), None);
        let chunk = chunk.with_embedding(vec![0.1, 0.2]);
        assert_eq!(chunk.dimensions(), Some(2));
    }
}
