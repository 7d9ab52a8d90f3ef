//! Process-wide orchestration state
//!
//! Constructed once and shared by reference with the router and the
//! embedding generator. Tests build a fresh instance each.

use crate::llm::{CooldownState, UsageTracker};
use crate::providers::ProviderRegistry;
use std::sync::Arc;

/// Shared mutable state of the pipeline
#[derive(Debug, Default)]
pub struct OrchestratorState {
    pub usage: UsageTracker,
    pub cooldowns: CooldownState,
}

impl OrchestratorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with usage windows registered for every provider
    pub fn for_registry(registry: &ProviderRegistry) -> Arc<Self> {
        Arc::new(Self {
            usage: UsageTracker::for_registry(registry),
            cooldowns: CooldownState::new(),
        })
    }
}
