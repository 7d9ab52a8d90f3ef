//! Per-provider sliding-window usage counters
//!
//! Each provider has its own window behind its own mutex, so concurrent
//! calls against one provider never lose increments and providers never
//! contend with each other. Critical sections are append or prune only.

use crate::providers::{ProviderRegistry, RateLimit};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct UsageWindow {
    limit: RateLimit,
    requests: VecDeque<Instant>,
    tokens: VecDeque<(Instant, u64)>,
    /// Set by a rate-limit signal; blocks selection whatever the limits say
    saturated_until: Option<Instant>,
    recorded_calls: u64,
    recorded_tokens: u64,
}

impl UsageWindow {
    fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            requests: VecDeque::new(),
            tokens: VecDeque::new(),
            saturated_until: None,
            recorded_calls: 0,
            recorded_tokens: 0,
        }
    }

    fn token_horizon(&self) -> Duration {
        if self.limit.tokens_per_day.is_some() {
            DAY
        } else {
            MINUTE
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&t) = self.requests.front() {
            if now.saturating_duration_since(t) >= MINUTE {
                self.requests.pop_front();
            } else {
                break;
            }
        }
        let horizon = self.token_horizon();
        while let Some(&(t, _)) = self.tokens.front() {
            if now.saturating_duration_since(t) >= horizon {
                self.tokens.pop_front();
            } else {
                break;
            }
        }
    }

    fn tokens_since(&self, now: Instant, span: Duration) -> u64 {
        self.tokens
            .iter()
            .rev()
            .take_while(|(t, _)| now.saturating_duration_since(*t) < span)
            .map(|(_, n)| n)
            .sum()
    }

    fn is_available(&mut self, now: Instant) -> bool {
        self.prune(now);

        match self.saturated_until {
            Some(until) if now < until => return false,
            Some(_) => self.saturated_until = None,
            None => {}
        }
        let rpm = self.limit.requests_per_minute as usize;
        if rpm > 0 && self.requests.len() >= rpm {
            return false;
        }
        if let Some(tpm) = self.limit.tokens_per_minute {
            if self.tokens_since(now, MINUTE) >= tpm {
                return false;
            }
        }
        if let Some(tpd) = self.limit.tokens_per_day {
            if self.tokens_since(now, DAY) >= tpd {
                return false;
            }
        }
        true
    }
}

/// Point-in-time view of one provider's usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    /// Calls recorded via `record_usage` since startup
    pub recorded_calls: u64,
    pub recorded_tokens: u64,
    /// Entries currently inside the request window (includes saturation)
    pub requests_in_window: usize,
    pub tokens_last_minute: u64,
    pub tokens_last_day: u64,
}

/// Sliding-window request and token counters keyed by provider
#[derive(Debug, Default)]
pub struct UsageTracker {
    windows: RwLock<HashMap<String, Arc<Mutex<UsageWindow>>>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker pre-registered with every provider's limits
    pub fn for_registry(registry: &ProviderRegistry) -> Self {
        let tracker = Self::new();
        for provider in registry.all() {
            tracker.register(&provider.name, provider.rate_limit);
        }
        tracker
    }

    /// Register (or update) the limits for a provider
    pub fn register(&self, provider: &str, limit: RateLimit) {
        if let Ok(mut windows) = self.windows.write() {
            match windows.get(provider) {
                Some(window) => {
                    if let Ok(mut w) = window.lock() {
                        w.limit = limit;
                    }
                }
                None => {
                    windows.insert(
                        provider.to_string(),
                        Arc::new(Mutex::new(UsageWindow::new(limit))),
                    );
                }
            }
        }
    }

    fn window(&self, provider: &str) -> Arc<Mutex<UsageWindow>> {
        if let Some(window) = self
            .windows
            .read()
            .ok()
            .and_then(|w| w.get(provider).cloned())
        {
            return window;
        }
        // Unknown providers get default limits on first use
        let mut windows = match self.windows.write() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        windows
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UsageWindow::new(RateLimit::default()))))
            .clone()
    }

    /// Record one call and the tokens it consumed
    pub fn record_usage(&self, provider: &str, tokens: u64) {
        let now = Instant::now();
        let window = self.window(provider);
        let mut w = match window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        w.requests.push_back(now);
        w.tokens.push_back((now, tokens));
        w.recorded_calls += 1;
        w.recorded_tokens += tokens;
    }

    /// Prune expired entries, then check every configured limit
    pub fn is_available(&self, provider: &str) -> bool {
        let now = Instant::now();
        let window = self.window(provider);
        let mut w = match window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        w.is_available(now)
    }

    /// Block the provider for one request window and fill its request
    /// window. Does not count as recorded calls. Applies even when the
    /// request limit is unbounded.
    pub fn saturate(&self, provider: &str) {
        let now = Instant::now();
        let window = self.window(provider);
        let mut w = match window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        w.prune(now);
        w.saturated_until = Some(now + MINUTE);
        let rpm = w.limit.requests_per_minute as usize;
        while w.requests.len() < rpm {
            w.requests.push_back(now);
        }
    }

    pub fn snapshot(&self, provider: &str) -> UsageSnapshot {
        let now = Instant::now();
        let window = self.window(provider);
        let mut w = match window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        w.prune(now);
        UsageSnapshot {
            recorded_calls: w.recorded_calls,
            recorded_tokens: w.recorded_tokens,
            requests_in_window: w.requests.len(),
            tokens_last_minute: w.tokens_since(now, MINUTE),
            tokens_last_day: w.tokens_since(now, DAY),
        }
    }
}
