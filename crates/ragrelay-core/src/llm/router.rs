//! Chat-generation router with rate-limit-aware failover
//!
//! Providers are sorted once by priority. A rotating cursor advances on
//! every selection, a selected provider is only called when its usage
//! window has room, and each provider is tried at most once per request.
//! When the only untried providers are saturated the router waits one
//! backoff interval and makes a single second pass.

use super::metrics::{MetricsRegistry, MetricsSnapshot};
use super::transport::{exchange, ProviderTransport};
use super::usage::UsageSnapshot;
use super::{ChatCompleter, ChatMessage, GenerationOptions, GenerationResult};
use crate::config::RouterConfig;
use crate::error::{FailureKind, ProviderFailure, RelayError, Result};
use crate::failover::{first_success, Attempt, AttemptError};
use crate::providers::{ProviderDescriptor, ProviderRegistry};
use crate::state::OrchestratorState;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Availability view of one routed provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStatus {
    pub name: String,
    pub model: String,
    pub priority: u32,
    pub available: bool,
    pub usage: UsageSnapshot,
}

/// Multi-provider chat router
pub struct ProviderRouter {
    order: Vec<Arc<ProviderDescriptor>>,
    transport: Arc<dyn ProviderTransport>,
    state: Arc<OrchestratorState>,
    metrics: MetricsRegistry,
    cursor: AtomicUsize,
    attempt_timeout: Duration,
    backoff: Duration,
}

impl ProviderRouter {
    pub fn new(
        registry: &ProviderRegistry,
        config: &RouterConfig,
        transport: Arc<dyn ProviderTransport>,
        state: Arc<OrchestratorState>,
    ) -> Self {
        let order = registry.chat_order(&config.priority_override);
        for provider in &order {
            state.usage.register(&provider.name, provider.rate_limit);
        }
        tracing::debug!(
            providers = ?order.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Chat routing order"
        );

        Self {
            order,
            transport,
            state,
            metrics: MetricsRegistry::new(),
            cursor: AtomicUsize::new(0),
            attempt_timeout: config.attempt_timeout(),
            backoff: config.backoff(),
        }
    }

    /// Providers in routing order
    pub fn providers(&self) -> &[Arc<ProviderDescriptor>] {
        &self.order
    }

    pub fn metrics(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.metrics.snapshot()
    }

    pub fn status(&self) -> Vec<ProviderStatus> {
        self.order
            .iter()
            .map(|p| ProviderStatus {
                name: p.name.clone(),
                model: p.model.clone(),
                priority: p.priority,
                available: self.state.usage.is_available(&p.name),
                usage: self.state.usage.snapshot(&p.name),
            })
            .collect()
    }

    /// Produce a result from exactly one successful provider call.
    ///
    /// Fails with `NoProviderAvailable` when nothing could be called and
    /// `AllProvidersExhausted` when every call made failed.
    pub async fn generate_response(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        if messages.is_empty() {
            return Err(RelayError::InvalidInput("no messages to send".to_string()));
        }
        let n = self.order.len();
        if n == 0 {
            return Err(RelayError::NoProviderAvailable);
        }

        let mut attempted: HashSet<String> = HashSet::new();
        let mut total_attempts = 0;

        for pass in 0..2 {
            let start = self.cursor.load(Ordering::Relaxed);
            let attempts: Vec<Attempt<'_, GenerationResult, ProviderFailure>> = (0..n)
                .map(|i| self.order[(start + i) % n].clone())
                .filter(|p| !attempted.contains(&p.name))
                .map(|provider| {
                    Attempt::new(provider.name.clone(), move || async move {
                        self.cursor.fetch_add(1, Ordering::Relaxed);
                        if !self.state.usage.is_available(&provider.name) {
                            return Err(AttemptError::Skipped("usage window full".to_string()));
                        }
                        self.call_provider(&provider, messages, options)
                            .await
                            .map_err(AttemptError::Failed)
                    })
                })
                .collect();

            match first_success("router", attempts).await {
                Ok(success) => return Ok(success.value),
                Err(report) => {
                    total_attempts += report.attempts();
                    attempted.extend(report.failures.into_iter().map(|(name, _)| name));

                    if report.skipped.is_empty() || pass == 1 {
                        break;
                    }
                    tracing::info!(
                        saturated = report.skipped.len(),
                        backoff_ms = self.backoff.as_millis() as u64,
                        "Remaining providers saturated, waiting before one retry"
                    );
                    tokio::time::sleep(self.backoff).await;
                }
            }
        }

        if total_attempts == 0 {
            tracing::error!("No provider available for generation");
            Err(RelayError::NoProviderAvailable)
        } else {
            tracing::error!(attempts = total_attempts, "All providers exhausted");
            Err(RelayError::AllProvidersExhausted {
                attempts: total_attempts,
            })
        }
    }

    /// One call against one provider. Records usage exactly once.
    async fn call_provider(
        &self,
        provider: &ProviderDescriptor,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> std::result::Result<GenerationResult, ProviderFailure> {
        let adapter = provider.adapter();
        let request = adapter.chat_request(provider, messages, options);
        let started = Instant::now();

        let outcome = exchange(self.transport.as_ref(), provider, request, self.attempt_timeout)
            .await
            .and_then(|body| {
                adapter
                    .parse_chat(&body)
                    .map_err(|m| ProviderFailure::malformed(&provider.name, m))
            });
        let latency = started.elapsed();

        match outcome {
            Ok(completion) => {
                self.state
                    .usage
                    .record_usage(&provider.name, completion.tokens_used);
                self.metrics.record(&provider.name, Ok(()), latency);
                tracing::debug!(
                    provider = %provider.name,
                    latency_ms = latency.as_millis() as u64,
                    tokens = completion.tokens_used,
                    "Generation succeeded"
                );
                Ok(GenerationResult {
                    text: completion.text,
                    tokens_used: completion.tokens_used,
                    provider_name: provider.name.clone(),
                    model_id: provider.model.clone(),
                })
            }
            Err(failure) => {
                self.state.usage.record_usage(&provider.name, 0);
                if failure.kind == FailureKind::RateLimit {
                    self.state.usage.saturate(&provider.name);
                }
                self.metrics
                    .record(&provider.name, Err(failure.kind), latency);
                Err(failure)
            }
        }
    }
}

#[async_trait]
impl ChatCompleter for ProviderRouter {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<GenerationResult> {
        self.generate_response(messages, options).await
    }
}
