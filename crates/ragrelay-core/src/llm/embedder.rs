//! Multi-provider embedding generation
//!
//! Providers are tried in the configured embedding order. A provider in
//! cooldown is skipped without a network call; quota errors put it in
//! cooldown (short for ordinary rate limiting, long for an exhausted quota
//! or a rejected credential). When every provider fails the generator
//! either returns a deterministic hash-derived vector (degraded mode) or
//! reports that no embedding is available.

use super::metrics::{MetricsRegistry, MetricsSnapshot};
use super::transport::{exchange, ProviderTransport};
use super::Embedder;
use crate::config::Config;
use crate::error::{FailureKind, ProviderFailure, RelayError, Result};
use crate::failover::{first_success, Attempt, AttemptError};
use crate::providers::{ProviderDescriptor, ProviderRegistry};
use crate::state::OrchestratorState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of an embedding request
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// Vector produced by a provider
    Provider { vector: Vec<f32>, provider: String },
    /// Hash-derived stand-in; never persisted
    Degraded(Vec<f32>),
    /// No vector; callers use lexical search
    Unavailable,
}

impl EmbeddingOutcome {
    pub fn into_vector(self) -> Option<Vec<f32>> {
        match self {
            Self::Provider { vector, .. } | Self::Degraded(vector) => Some(vector),
            Self::Unavailable => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Embedding generator with per-provider cooldowns
pub struct EmbeddingGenerator {
    order: Vec<Arc<ProviderDescriptor>>,
    transport: Arc<dyn ProviderTransport>,
    state: Arc<OrchestratorState>,
    metrics: MetricsRegistry,
    short_cooldown: Duration,
    long_cooldown: Duration,
    attempt_timeout: Duration,
    /// Dimensionality of degraded vectors, when degraded mode is allowed
    degraded_dimensions: Option<usize>,
}

impl EmbeddingGenerator {
    pub fn new(
        registry: &ProviderRegistry,
        config: &Config,
        transport: Arc<dyn ProviderTransport>,
        state: Arc<OrchestratorState>,
    ) -> Self {
        let order = registry.embedding_order(&config.embedding);
        tracing::debug!(
            providers = ?order.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            degraded = config.degraded_embeddings_allowed(),
            "Embedding provider order"
        );

        Self {
            order,
            transport,
            state,
            metrics: MetricsRegistry::new(),
            short_cooldown: config.embedding.short_cooldown(),
            long_cooldown: config.embedding.long_cooldown(),
            attempt_timeout: config.embedding.attempt_timeout(),
            degraded_dimensions: config
                .degraded_embeddings_allowed()
                .then_some(config.embedding.dimensions),
        }
    }

    /// Providers in attempt order
    pub fn providers(&self) -> &[Arc<ProviderDescriptor>] {
        &self.order
    }

    pub fn metrics(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics.snapshot()
    }

    pub fn degraded_mode(&self) -> bool {
        self.degraded_dimensions.is_some()
    }

    /// Vector for `text`, or `None` when callers must fall back to lexical
    /// search. Never fails.
    pub async fn generate_embedding(&self, text: &str) -> Option<Vec<f32>> {
        self.generate(text).await.into_vector()
    }

    pub async fn generate(&self, text: &str) -> EmbeddingOutcome {
        if text.trim().is_empty() {
            tracing::debug!("Empty text, no embedding");
            return EmbeddingOutcome::Unavailable;
        }

        let attempts: Vec<Attempt<'_, Vec<f32>, ProviderFailure>> = self
            .order
            .iter()
            .map(|provider| {
                Attempt::new(provider.name.clone(), move || async move {
                    if let Some(left) = self.state.cooldowns.remaining(&provider.name) {
                        return Err(AttemptError::Skipped(format!(
                            "cooling down for {}s",
                            left.as_secs()
                        )));
                    }
                    self.call_provider(provider, text)
                        .await
                        .map_err(AttemptError::Failed)
                })
            })
            .collect();

        match first_success("embedding", attempts).await {
            Ok(success) => EmbeddingOutcome::Provider {
                vector: success.value,
                provider: success.name,
            },
            Err(report) => match self.degraded_dimensions {
                Some(dims) => {
                    tracing::info!(
                        failed = report.attempts(),
                        skipped = report.skipped.len(),
                        "No embedding provider succeeded, using degraded vector"
                    );
                    EmbeddingOutcome::Degraded(degraded_vector(text, dims))
                }
                None => {
                    tracing::warn!(
                        failed = report.attempts(),
                        skipped = report.skipped.len(),
                        "No embedding provider succeeded, embedding unavailable"
                    );
                    EmbeddingOutcome::Unavailable
                }
            },
        }
    }

    async fn call_provider(
        &self,
        provider: &ProviderDescriptor,
        text: &str,
    ) -> std::result::Result<Vec<f32>, ProviderFailure> {
        let adapter = provider.adapter();
        let request = adapter.embed_request(provider, text);
        let started = Instant::now();

        let outcome = exchange(self.transport.as_ref(), provider, request, self.attempt_timeout)
            .await
            .and_then(|body| {
                let raw = adapter
                    .parse_embedding(&body)
                    .map_err(|m| ProviderFailure::malformed(&provider.name, m))?;
                validate_vector(&raw).ok_or_else(|| {
                    ProviderFailure::malformed(&provider.name, "no finite numbers in embedding")
                })
            });
        let latency = started.elapsed();

        match outcome {
            Ok(vector) => {
                self.metrics.record(&provider.name, Ok(()), latency);
                Ok(vector)
            }
            Err(failure) => {
                self.metrics
                    .record(&provider.name, Err(failure.kind), latency);
                self.apply_cooldown(&failure);
                Err(failure)
            }
        }
    }

    fn apply_cooldown(&self, failure: &ProviderFailure) {
        let duration = match failure.kind {
            FailureKind::RateLimit if failure.is_hard_quota() => self.long_cooldown,
            FailureKind::RateLimit => self.short_cooldown,
            FailureKind::Auth => self.long_cooldown,
            _ => return,
        };
        tracing::warn!(
            provider = %failure.provider,
            kind = %failure.kind,
            cooldown_secs = duration.as_secs(),
            "Embedding provider placed in cooldown"
        );
        self.state
            .cooldowns
            .disable_for(&failure.provider, duration);
    }
}

#[async_trait]
impl Embedder for EmbeddingGenerator {
    /// Only provider vectors are returned. Degraded vectors are not
    /// comparable with stored embeddings, so search treats them as missing.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.generate(text).await {
            EmbeddingOutcome::Provider { vector, .. } => Ok(vector),
            EmbeddingOutcome::Degraded(_) | EmbeddingOutcome::Unavailable => {
                Err(RelayError::NoProviderAvailable)
            }
        }
    }

    fn model_name(&self) -> &str {
        self.order
            .first()
            .map(|p| p.embedding_model())
            .unwrap_or("degraded")
    }
}

/// Accept finite numbers and numeric strings, drop everything else.
/// `None` when nothing usable remains.
pub fn validate_vector(raw: &[Value]) -> Option<Vec<f32>> {
    let vector: Vec<f32> = raw
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .map(|f| f as f32)
        .filter(|f| f.is_finite())
        .collect();

    if vector.is_empty() {
        None
    } else {
        Some(vector)
    }
}

/// Deterministic unit vector derived from a hash of the text
pub fn degraded_vector(text: &str, dimensions: usize) -> Vec<f32> {
    let mut reader = blake3::Hasher::new()
        .update(text.as_bytes())
        .finalize_xof();

    let mut bytes = vec![0u8; dimensions * 4];
    reader.fill(&mut bytes);

    let mut vector: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| {
            let n = u32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            (n as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();

    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_vector_coerces_and_drops() {
        let raw = vec![
            json!(0.5),
            json!("0.25"),
            json!("abc"),
            json!(null),
            json!({"x": 1}),
            json!(-1),
        ];
        assert_eq!(validate_vector(&raw), Some(vec![0.5, 0.25, -1.0]));
    }

    #[test]
    fn test_validate_vector_rejects_empty() {
        assert_eq!(validate_vector(&[]), None);
        assert_eq!(validate_vector(&[json!("nan"), json!("x")]), None);
    }

    #[test]
    fn test_degraded_vector_deterministic() {
        let a = degraded_vector("refund policy", 64);
        let b = degraded_vector("refund policy", 64);
        let c = degraded_vector("shipping policy", 64);
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }
}
