//! Provider registry
//!
//! Static description of every configured LLM / embedding endpoint:
//! - endpoint, credential and model identifiers
//! - rate limits (requests per minute, optional token budgets)
//! - static priority and enabled flag
//! - request/response shape, resolved once to a [`ShapeAdapter`]
//!
//! Descriptors are immutable after load. The chat order and the embedding
//! order are derived independently since some providers support only one
//! capability.

mod shape;

pub use shape::{AlternateAdapter, ProviderShape, ShapeAdapter, StandardAdapter};

use crate::config::{Config, EmbeddingConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-provider rate limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,

    #[serde(default)]
    pub tokens_per_minute: Option<u64>,

    #[serde(default)]
    pub tokens_per_day: Option<u64>,
}

impl RateLimit {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            tokens_per_minute: None,
            tokens_per_day: None,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(default_rpm())
    }
}

fn default_rpm() -> u32 {
    60
}

/// One provider endpoint
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub endpoint: String,
    credential: Option<String>,
    pub shape: ProviderShape,
    pub model: String,
    pub embedding_model: Option<String>,
    pub supports_embeddings: bool,
    pub rate_limit: RateLimit,
    pub priority: u32,
    pub enabled: bool,
    adapter: Arc<dyn ShapeAdapter>,
}

impl ProviderDescriptor {
    /// Create an enabled provider with default limits
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        shape: ProviderShape,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential: None,
            shape,
            model: model.into(),
            embedding_model: None,
            supports_embeddings: false,
            rate_limit: RateLimit::default(),
            priority: 100,
            enabled: true,
            adapter: shape.adapter(),
        }
    }

    /// Build from configuration with an already resolved credential
    pub fn from_config(config: &crate::config::ProviderConfig, credential: Option<String>) -> Self {
        let enabled = config.enabled && (credential.is_some() || !config.requires_credential());
        let mut descriptor = Self::new(
            config.name.to_lowercase(),
            config.endpoint.clone(),
            config.shape,
            config.model.clone(),
        );
        descriptor.credential = credential;
        descriptor.embedding_model = config.embedding_model.clone();
        descriptor.supports_embeddings = config.supports_embeddings;
        descriptor.rate_limit = config.rate_limit;
        descriptor.priority = config.priority;
        descriptor.enabled = enabled;
        descriptor
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self.supports_embeddings = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn adapter(&self) -> &dyn ShapeAdapter {
        self.adapter.as_ref()
    }

    /// Model used for embedding requests
    pub fn embedding_model(&self) -> &str {
        self.embedding_model.as_deref().unwrap_or(&self.model)
    }
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("has_credential", &self.credential.is_some())
            .field("shape", &self.shape)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("rate_limit", &self.rate_limit)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Registry of configured providers
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<ProviderDescriptor>>,
    by_name: HashMap<String, usize>,
}

impl ProviderRegistry {
    /// Create registry from descriptors
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        let mut registry = Self::default();
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    /// Create registry from configuration, resolving credentials from the
    /// process environment
    pub fn from_config(config: &Config) -> Self {
        Self::from_config_with(config, |key| std::env::var(key).ok())
    }

    /// Create registry from configuration with a custom credential lookup
    pub fn from_config_with<F>(config: &Config, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let descriptors = config
            .providers
            .iter()
            .map(|p| {
                let credential = p.credential_with(&lookup);
                let descriptor = ProviderDescriptor::from_config(p, credential);
                if !descriptor.enabled {
                    tracing::debug!(provider = %descriptor.name, "Provider disabled (no credential or flag off)");
                }
                descriptor
            })
            .collect();
        Self::new(descriptors)
    }

    /// Register a provider, replacing any previous entry with the same name
    pub fn register(&mut self, descriptor: ProviderDescriptor) {
        let descriptor = Arc::new(descriptor);
        if let Some(&idx) = self.by_name.get(&descriptor.name) {
            self.providers[idx] = descriptor;
        } else {
            self.by_name
                .insert(descriptor.name.clone(), self.providers.len());
            self.providers.push(descriptor);
        }
    }

    /// Get provider by name
    pub fn get(&self, name: &str) -> Option<Arc<ProviderDescriptor>> {
        self.by_name.get(name).map(|&idx| self.providers[idx].clone())
    }

    /// All registered providers, enabled or not
    pub fn all(&self) -> &[Arc<ProviderDescriptor>] {
        &self.providers
    }

    pub fn enabled(&self) -> impl Iterator<Item = &Arc<ProviderDescriptor>> {
        self.providers.iter().filter(|p| p.enabled)
    }

    /// Chat providers in routing order: ascending priority, with the names
    /// in `priority_override` moved to the front in the given order
    pub fn chat_order(&self, priority_override: &[String]) -> Vec<Arc<ProviderDescriptor>> {
        let mut ordered: Vec<Arc<ProviderDescriptor>> = self.enabled().cloned().collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));

        if priority_override.is_empty() {
            return ordered;
        }

        let rank = |name: &str| {
            priority_override
                .iter()
                .position(|o| o == name)
                .unwrap_or(usize::MAX)
        };
        // Stable sort keeps the priority order among unlisted providers
        ordered.sort_by_key(|p| rank(&p.name));
        ordered
    }

    /// Embedding providers in attempt order.
    ///
    /// An explicit list is honoured as given, even for providers that do not
    /// advertise embedding support. Otherwise every embedding-capable
    /// provider is used by ascending priority. Disabled names are removed
    /// in both cases.
    pub fn embedding_order(&self, config: &EmbeddingConfig) -> Vec<Arc<ProviderDescriptor>> {
        let is_disabled = |name: &str| config.disabled.iter().any(|d| d == name);

        let ordered: Vec<Arc<ProviderDescriptor>> = if config.providers.is_empty() {
            let mut capable: Vec<_> = self
                .enabled()
                .filter(|p| p.supports_embeddings)
                .cloned()
                .collect();
            capable.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
            capable
        } else {
            config
                .providers
                .iter()
                .filter_map(|name| {
                    let found = self.get(name);
                    if found.is_none() {
                        tracing::warn!(provider = %name, "Unknown embedding provider in priority list");
                    }
                    found
                })
                .filter(|p| p.enabled)
                .collect()
        };

        ordered
            .into_iter()
            .filter(|p| !is_disabled(&p.name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(vec![
            ProviderDescriptor::new("c", "http://c", ProviderShape::Standard, "m").with_priority(3),
            ProviderDescriptor::new("a", "http://a/", ProviderShape::Standard, "m")
                .with_priority(1),
            ProviderDescriptor::new("g", "http://g", ProviderShape::Alternate, "m")
                .with_priority(2)
                .with_embedding_model("text-embedding-004"),
            ProviderDescriptor::new("off", "http://off", ProviderShape::Standard, "m")
                .with_priority(0)
                .disabled(),
        ])
    }

    #[test]
    fn test_chat_order_by_priority() {
        let names: Vec<_> = registry()
            .chat_order(&[])
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["a", "g", "c"]);
    }

    #[test]
    fn test_chat_order_override() {
        let names: Vec<_> = registry()
            .chat_order(&["c".to_string()])
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["c", "a", "g"]);
    }

    #[test]
    fn test_embedding_order_defaults_to_capable_providers() {
        let names: Vec<_> = registry()
            .embedding_order(&EmbeddingConfig::default())
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["g"]);
    }

    #[test]
    fn test_embedding_order_explicit_and_disabled() {
        let config = EmbeddingConfig {
            providers: vec!["c".to_string(), "g".to_string(), "missing".to_string()],
            disabled: vec!["g".to_string()],
            ..EmbeddingConfig::default()
        };
        let names: Vec<_> = registry()
            .embedding_order(&config)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        assert_eq!(names, vec!["c"]);
    }

    #[test]
    fn test_credential_presence_enables_provider() {
        let config = Config::default();
        let registry = ProviderRegistry::from_config_with(&config, |key| {
            (key == "OPENAI_API_KEY").then(|| "sk-test".to_string())
        });
        let enabled: Vec<_> = registry.enabled().map(|p| p.name.clone()).collect();
        assert_eq!(enabled, vec!["openai"]);
        assert_eq!(registry.get("openai").unwrap().credential(), Some("sk-test"));
        assert!(!registry.get("groq").unwrap().enabled);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        assert_eq!(registry().get("a").unwrap().endpoint, "http://a");
    }

    #[test]
    fn test_debug_hides_credential() {
        let p = ProviderDescriptor::new("a", "http://a", ProviderShape::Standard, "m")
            .with_credential("secret-key");
        assert!(!format!("{:?}", p).contains("secret-key"));
    }
}
