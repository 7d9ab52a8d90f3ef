//! Per-provider call metrics for monitoring

use crate::error::FailureKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// API metrics for one provider
#[derive(Debug, Default)]
pub struct ProviderMetrics {
    pub attempts: AtomicU64,
    pub successes: AtomicU64,
    pub rate_limited: AtomicU64,
    pub auth_errors: AtomicU64,
    pub timeouts: AtomicU64,
    pub malformed: AtomicU64,
    pub unclassified: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

impl ProviderMetrics {
    fn record(&self, outcome: Result<(), FailureKind>, latency: Duration) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
        let counter = match outcome {
            Ok(()) => &self.successes,
            Err(FailureKind::RateLimit) => &self.rate_limited,
            Err(FailureKind::Auth) => &self.auth_errors,
            Err(FailureKind::Timeout) => &self.timeouts,
            Err(FailureKind::Malformed) => &self.malformed,
            Err(FailureKind::Unclassified) => &self.unclassified,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let attempts = self.attempts.load(Ordering::Relaxed);
        let failures = self.rate_limited.load(Ordering::Relaxed)
            + self.auth_errors.load(Ordering::Relaxed)
            + self.timeouts.load(Ordering::Relaxed)
            + self.malformed.load(Ordering::Relaxed)
            + self.unclassified.load(Ordering::Relaxed);

        MetricsSnapshot {
            attempts,
            successes: self.successes.load(Ordering::Relaxed),
            failures,
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            auth_errors: self.auth_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            avg_latency_ms: if attempts > 0 {
                self.total_latency_ms.load(Ordering::Relaxed) as f64 / attempts as f64
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of one provider's metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub rate_limited: u64,
    pub auth_errors: u64,
    pub timeouts: u64,
    pub avg_latency_ms: f64,
}

/// Metrics keyed by provider name
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    providers: RwLock<HashMap<String, Arc<ProviderMetrics>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, provider: &str) -> Arc<ProviderMetrics> {
        if let Some(m) = self
            .providers
            .read()
            .ok()
            .and_then(|p| p.get(provider).cloned())
        {
            return m;
        }
        let mut providers = match self.providers.write() {
            Ok(p) => p,
            Err(poisoned) => poisoned.into_inner(),
        };
        providers
            .entry(provider.to_string())
            .or_default()
            .clone()
    }

    pub fn record(&self, provider: &str, outcome: Result<(), FailureKind>, latency: Duration) {
        self.entry(provider).record(outcome, latency);
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.providers
            .read()
            .map(|p| {
                p.iter()
                    .map(|(name, m)| (name.clone(), m.snapshot()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
