//! Embedding-provider cooldowns

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tokio::time::Instant;

/// Per-provider `disabled_until` timestamps. An entry is cleared lazily
/// once its deadline has passed.
#[derive(Debug, Default)]
pub struct CooldownState {
    disabled_until: RwLock<HashMap<String, Instant>>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip `provider` for `duration`. An existing longer cooldown is kept.
    pub fn disable_for(&self, provider: &str, duration: Duration) {
        let until = Instant::now() + duration;
        let mut map = match self.disabled_until.write() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = map.entry(provider.to_string()).or_insert(until);
        if *entry < until {
            *entry = until;
        }
    }

    pub fn is_cooling_down(&self, provider: &str) -> bool {
        self.remaining(provider).is_some()
    }

    /// Time left before the provider may be tried again
    pub fn remaining(&self, provider: &str) -> Option<Duration> {
        let now = Instant::now();
        let until = {
            let map = self.disabled_until.read().ok()?;
            *map.get(provider)?
        };
        if until > now {
            return Some(until - now);
        }
        if let Ok(mut map) = self.disabled_until.write() {
            if map.get(provider).is_some_and(|u| *u <= now) {
                map.remove(provider);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_elapses() {
        let state = CooldownState::new();
        state.disable_for("openai", Duration::from_secs(300));
        assert!(state.is_cooling_down("openai"));
        assert!(!state.is_cooling_down("gemini"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(state.is_cooling_down("openai"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!state.is_cooling_down("openai"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_cooldown_does_not_shorten_longer_one() {
        let state = CooldownState::new();
        state.disable_for("openai", Duration::from_secs(3600));
        state.disable_for("openai", Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(state.is_cooling_down("openai"));
        assert!(state.remaining("openai").unwrap() > Duration::from_secs(3000));
    }
}
