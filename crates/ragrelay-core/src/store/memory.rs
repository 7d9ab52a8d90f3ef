//! In-memory knowledge store

use super::{KnowledgeChunk, KnowledgeStore};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-local store keyed by tenant. Each tenant keeps a single
/// embedding dimensionality.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tenants: RwLock<HashMap<String, Vec<KnowledgeChunk>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with chunks. Chunks carrying an embedding whose length
    /// disagrees with the tenant's are rejected.
    pub fn with_chunks(chunks: Vec<KnowledgeChunk>) -> Result<Self> {
        let store = Self::new();
        {
            let mut tenants = store.write()?;
            for chunk in chunks {
                let existing = tenants.entry(chunk.tenant_id.clone()).or_default();
                if let Some(dims) = chunk.dimensions() {
                    check_dimensions(existing, None, dims)?;
                }
                existing.push(chunk);
            }
        }
        Ok(store)
    }

    /// Embedding length shared by the tenant's chunks, if any are embedded
    pub fn tenant_dimensions(&self, tenant_id: &str) -> Result<Option<usize>> {
        let tenants = self.read()?;
        Ok(tenants
            .get(tenant_id)
            .and_then(|chunks| chunks.iter().find_map(KnowledgeChunk::dimensions)))
    }

    pub fn chunk_count(&self, tenant_id: &str) -> usize {
        self.read()
            .map(|t| t.get(tenant_id).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<KnowledgeChunk>>>> {
        self.tenants
            .read()
            .map_err(|_| RelayError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<KnowledgeChunk>>>> {
        self.tenants
            .write()
            .map_err(|_| RelayError::Store("store lock poisoned".to_string()))
    }
}

/// Ensure `dims` agrees with every other embedded chunk of the tenant
fn check_dimensions(chunks: &[KnowledgeChunk], skip_id: Option<&str>, dims: usize) -> Result<()> {
    let established = chunks
        .iter()
        .filter(|c| Some(c.id.as_str()) != skip_id)
        .find_map(KnowledgeChunk::dimensions);
    match established {
        Some(expected) if expected != dims => Err(RelayError::DimensionMismatch {
            expected,
            actual: dims,
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn load_tenant_chunks(&self, tenant_id: &str) -> Result<Vec<KnowledgeChunk>> {
        let tenants = self.read()?;
        Ok(tenants.get(tenant_id).cloned().unwrap_or_default())
    }

    async fn persist_chunk_embedding(&self, chunk: &KnowledgeChunk, vector: &[f32]) -> Result<()> {
        if vector.is_empty() {
            return Err(RelayError::InvalidInput("empty embedding".to_string()));
        }

        let mut tenants = self.write()?;
        let chunks = tenants
            .get_mut(&chunk.tenant_id)
            .ok_or_else(|| RelayError::Store(format!("unknown tenant: {}", chunk.tenant_id)))?;

        check_dimensions(chunks, Some(&chunk.id), vector.len())?;

        let stored = chunks
            .iter_mut()
            .find(|c| c.id == chunk.id)
            .ok_or_else(|| RelayError::Store(format!("unknown chunk: {}", chunk.id)))?;
        stored.embedding = Some(vector.to_vec());
        Ok(())
    }

    async fn chunks_missing_embedding(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<KnowledgeChunk>> {
        let tenants = self.read()?;
        let mut missing: Vec<KnowledgeChunk> = tenants
            .get(tenant_id)
            .map(|chunks| {
                chunks
                    .iter()
                    .filter(|c| !c.has_embedding())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        missing.sort_by_key(|c| (c.created_at, c.metadata.index));
        missing.truncate(limit);
        Ok(missing)
    }

    async fn replace_document_chunks(
        &self,
        tenant_id: &str,
        document_id: &str,
        chunks: Vec<KnowledgeChunk>,
    ) -> Result<()> {
        if let Some(stray) = chunks
            .iter()
            .find(|c| c.tenant_id != tenant_id || c.document_id != document_id)
        {
            return Err(RelayError::InvalidInput(format!(
                "chunk {} does not belong to {}/{}",
                stray.id, tenant_id, document_id
            )));
        }

        let mut tenants = self.write()?;
        let existing = tenants.entry(tenant_id.to_string()).or_default();
        let kept: Vec<KnowledgeChunk> = existing
            .iter()
            .filter(|c| c.document_id != document_id)
            .cloned()
            .collect();
        for chunk in &chunks {
            if let Some(dims) = chunk.dimensions() {
                check_dimensions(&kept, None, dims)?;
                check_dimensions(&chunks, None, dims)?;
            }
        }
        *existing = kept;
        existing.extend(chunks);
        tracing::debug!(
            tenant = tenant_id,
            document = document_id,
            chunks = existing.len(),
            "Replaced document chunks"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(tenant: &str, doc: &str, index: usize, text: &str) -> KnowledgeChunk {
        KnowledgeChunk::new(tenant, doc, index, text, "upload")
    }

    #[tokio::test]
    async fn test_replace_document_chunks() {
        let store = MemoryStore::new();
        store
            .replace_document_chunks("t", "d1", vec![chunk("t", "d1", 0, "a"), chunk("t", "d1", 1, "b")])
            .await
            .unwrap();
        store
            .replace_document_chunks("t", "d2", vec![chunk("t", "d2", 0, "c")])
            .await
            .unwrap();
        assert_eq!(store.chunk_count("t"), 3);

        store
            .replace_document_chunks("t", "d1", vec![chunk("t", "d1", 0, "z")])
            .await
            .unwrap();
        let chunks = store.load_tenant_chunks("t").await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().any(|c| c.content == "z"));
        assert!(!chunks.iter().any(|c| c.content == "a"));
    }

    #[tokio::test]
    async fn test_replace_rejects_foreign_chunk() {
        let store = MemoryStore::new();
        let err = store
            .replace_document_chunks("t", "d1", vec![chunk("other", "d1", 0, "a")])
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_persist_enforces_tenant_dimensions() {
        let a = chunk("t", "d", 0, "a");
        let b = chunk("t", "d", 1, "b");
        let other = chunk("u", "d", 0, "c");
        let store = MemoryStore::with_chunks(vec![a.clone(), b.clone(), other.clone()]).unwrap();

        store.persist_chunk_embedding(&a, &[0.1, 0.2, 0.3]).await.unwrap();
        let err = store.persist_chunk_embedding(&b, &[0.1, 0.2]).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));

        // Another tenant is free to use its own dimensionality
        store.persist_chunk_embedding(&other, &[0.5, 0.5]).await.unwrap();
        assert_eq!(store.tenant_dimensions("t").unwrap(), Some(3));
        assert_eq!(store.tenant_dimensions("u").unwrap(), Some(2));

        // Re-embedding the only embedded chunk may change its length
        store.persist_chunk_embedding(&a, &[1.0]).await.unwrap();
        assert_eq!(store.tenant_dimensions("t").unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_chunks_missing_embedding() {
        let a = chunk("t", "d", 0, "a");
        let b = chunk("t", "d", 1, "b");
        let store = MemoryStore::with_chunks(vec![a.clone(), b.clone()]).unwrap();
        store.persist_chunk_embedding(&a, &[1.0, 0.0]).await.unwrap();

        let missing = store.chunks_missing_embedding("t", 10).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, b.id);
        assert!(store.chunks_missing_embedding("t", 0).await.unwrap().is_empty());
        assert!(store.chunks_missing_embedding("nobody", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_with_chunks_rejects_mixed_dimensions() {
        let result = MemoryStore::with_chunks(vec![
            chunk("t", "d", 0, "a").with_embedding(vec![1.0, 0.0]),
            chunk("t", "d", 1, "b").with_embedding(vec![1.0]),
        ]);
        assert!(result.is_err());
    }
}
