//! Response cache contract keyed by normalized-query fingerprint
//!
//! The storage backend is an external collaborator; only the contract and
//! an in-memory implementation live here.

use super::{ChatMessage, GenerationResult};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Fingerprint-keyed store of generation results
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn load_cached_response(&self, fingerprint: &str) -> Result<Option<GenerationResult>>;

    async fn store_cached_response(
        &self,
        fingerprint: &str,
        result: &GenerationResult,
        ttl: Duration,
    ) -> Result<()>;
}

/// Collapse case and whitespace so trivially different phrasings share a key
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 over the normalized role/content sequence
pub fn fingerprint(messages: &[ChatMessage]) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.role.as_bytes());
        hasher.update([0x1f]);
        hasher.update(normalize_query(&message.content).as_bytes());
        hasher.update([0x1e]);
    }
    format!("chat:{:x}", hasher.finalize())
}

/// Cache entry with TTL
#[derive(Clone)]
struct CacheEntry {
    value: GenerationResult,
    expires_at: SystemTime,
}

/// In-memory response cache
#[derive(Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear expired entries
    pub fn cleanup(&self) {
        if let Ok(mut entries) = self.entries.write() {
            let now = SystemTime::now();
            entries.retain(|_, entry| now < entry.expires_at);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(entries) = self.entries.read() {
            let now = SystemTime::now();
            let total = entries.len();
            let expired = entries.values().filter(|e| now >= e.expires_at).count();

            CacheStats {
                total_entries: total,
                expired_entries: expired,
                active_entries: total - expired,
            }
        } else {
            CacheStats::default()
        }
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn load_cached_response(&self, fingerprint: &str) -> Result<Option<GenerationResult>> {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => return Ok(None),
        };
        Ok(entries
            .get(fingerprint)
            .filter(|entry| SystemTime::now() < entry.expires_at)
            .map(|entry| entry.value.clone()))
    }

    async fn store_cached_response(
        &self,
        fingerprint: &str,
        result: &GenerationResult,
        ttl: Duration,
    ) -> Result<()> {
        let now = SystemTime::now();
        let entry = CacheEntry {
            value: result.clone(),
            expires_at: now + ttl,
        };
        if let Ok(mut entries) = self.entries.write() {
            // Drop expired entries on every write so the map stays bounded by live keys
            entries.retain(|_, entry| now < entry.expires_at);
            entries.insert(fingerprint.to_string(), entry);
        }
        Ok(())
    }
}

/// Cache statistics
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}
