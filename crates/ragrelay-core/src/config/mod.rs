//! Configuration management
//!
//! Configuration is read from YAML (`$RAGRELAY_CONFIG` or the platform config
//! dir) and then adjusted by environment-style overrides.

use crate::error::{RelayError, Result};
use crate::providers::{ProviderShape, RateLimit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configured providers (chat and/or embeddings)
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub environment: Environment,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            router: RouterConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
            chunking: ChunkingConfig::default(),
            cache: CacheConfig::default(),
            environment: Environment::default(),
        }
    }
}

/// Deployment environment. Degraded embeddings are only produced outside
/// production unless explicitly allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// One external provider endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,

    /// Base URL of the provider API
    pub endpoint: String,

    /// Environment variable holding the credential
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Inline credential (takes precedence over `api_key_env`)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request/response shape
    #[serde(default)]
    pub shape: ProviderShape,

    /// Chat completion model
    pub model: String,

    /// Embedding model, when the provider supports embeddings
    #[serde(default)]
    pub embedding_model: Option<String>,

    #[serde(default)]
    pub supports_embeddings: bool,

    #[serde(default)]
    pub rate_limit: RateLimit,

    /// Lower value is preferred
    #[serde(default = "default_priority")]
    pub priority: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ProviderConfig {
    /// Resolve the credential using the given environment lookup
    pub fn credential_with<F>(&self, lookup: &F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }
        self.api_key_env
            .as_deref()
            .and_then(lookup)
            .filter(|v| !v.trim().is_empty())
    }

    /// A provider without any credential reference needs no key (local endpoints)
    pub fn requires_credential(&self) -> bool {
        self.api_key.is_some() || self.api_key_env.is_some()
    }
}

fn default_priority() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

/// Chat-generation routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout")]
    pub attempt_timeout_secs: u64,

    /// Wait before the single retry pass when every provider is saturated
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Explicit provider order; overrides static priorities when set
    #[serde(default)]
    pub priority_override: Vec<String>,
}

impl RouterConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_timeout(),
            backoff_ms: default_backoff_ms(),
            priority_override: Vec::new(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_backoff_ms() -> u64 {
    2000
}

/// Embedding generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Explicit provider order. Empty means every embedding-capable provider
    /// by ascending priority.
    #[serde(default)]
    pub providers: Vec<String>,

    /// Providers never used for embeddings, even with credentials present
    #[serde(default)]
    pub disabled: Vec<String>,

    /// Dimensionality of degraded vectors
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    #[serde(default = "default_short_cooldown")]
    pub short_cooldown_secs: u64,

    #[serde(default = "default_long_cooldown")]
    pub long_cooldown_secs: u64,

    /// Produce hash-derived vectors when every provider fails
    #[serde(default)]
    pub allow_degraded: bool,

    #[serde(default = "default_timeout")]
    pub attempt_timeout_secs: u64,

    /// Pause between sequential calls during bulk embedding
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl EmbeddingConfig {
    pub fn short_cooldown(&self) -> Duration {
        Duration::from_secs(self.short_cooldown_secs)
    }

    pub fn long_cooldown(&self) -> Duration {
        Duration::from_secs(self.long_cooldown_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            disabled: Vec::new(),
            dimensions: default_dimensions(),
            short_cooldown_secs: default_short_cooldown(),
            long_cooldown_secs: default_long_cooldown(),
            allow_degraded: false,
            attempt_timeout_secs: default_timeout(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

fn default_dimensions() -> usize {
    384
}

fn default_short_cooldown() -> u64 {
    5 * 60
}

fn default_long_cooldown() -> u64 {
    60 * 60
}

fn default_batch_delay_ms() -> u64 {
    250
}

/// Knowledge retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum cosine similarity for vector results
    #[serde(default = "default_threshold")]
    pub similarity_threshold: f32,

    /// Upper bound on the candidate pool scored per query
    #[serde(default = "default_max_pool")]
    pub max_candidate_pool: usize,

    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Rerank results with an LLM scoring call
    #[serde(default)]
    pub rerank: bool,

    #[serde(default = "default_rerank_batch")]
    pub rerank_batch: usize,

    /// Characters of each candidate sent to the reranker
    #[serde(default = "default_rerank_chars")]
    pub rerank_text_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_threshold(),
            max_candidate_pool: default_max_pool(),
            default_limit: default_limit(),
            rerank: false,
            rerank_batch: default_rerank_batch(),
            rerank_text_chars: default_rerank_chars(),
        }
    }
}

fn default_threshold() -> f32 {
    0.6
}

fn default_max_pool() -> usize {
    2000
}

fn default_limit() -> usize {
    5
}

fn default_rerank_batch() -> usize {
    10
}

fn default_rerank_chars() -> usize {
    400
}

/// Word-window chunking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,

    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            overlap: default_overlap(),
        }
    }
}

fn default_max_words() -> usize {
    crate::index::DEFAULT_MAX_WORDS
}

fn default_overlap() -> usize {
    crate::index::DEFAULT_OVERLAP_WORDS
}

/// Response cache contract settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

/// Built-in provider catalogue. Each entry is only enabled once its
/// credential variable is present.
fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "groq".to_string(),
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: Some("GROQ_API_KEY".to_string()),
            api_key: None,
            shape: ProviderShape::Standard,
            model: "llama-3.1-8b-instant".to_string(),
            embedding_model: None,
            supports_embeddings: false,
            rate_limit: RateLimit {
                requests_per_minute: 30,
                tokens_per_minute: Some(6_000),
                tokens_per_day: Some(500_000),
            },
            priority: 1,
            enabled: true,
        },
        ProviderConfig {
            name: "openrouter".to_string(),
            endpoint: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: Some("OPENROUTER_API_KEY".to_string()),
            api_key: None,
            shape: ProviderShape::Standard,
            model: "meta-llama/llama-3.1-8b-instruct:free".to_string(),
            embedding_model: None,
            supports_embeddings: false,
            rate_limit: RateLimit {
                requests_per_minute: 20,
                tokens_per_minute: None,
                tokens_per_day: Some(200_000),
            },
            priority: 2,
            enabled: true,
        },
        ProviderConfig {
            name: "gemini".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key_env: Some("GEMINI_API_KEY".to_string()),
            api_key: None,
            shape: ProviderShape::Alternate,
            model: "gemini-1.5-flash".to_string(),
            embedding_model: Some("text-embedding-004".to_string()),
            supports_embeddings: true,
            rate_limit: RateLimit {
                requests_per_minute: 15,
                tokens_per_minute: Some(1_000_000),
                tokens_per_day: None,
            },
            priority: 3,
            enabled: true,
        },
        ProviderConfig {
            name: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            api_key: None,
            shape: ProviderShape::Standard,
            model: "gpt-4o-mini".to_string(),
            embedding_model: Some("text-embedding-3-small".to_string()),
            supports_embeddings: true,
            rate_limit: RateLimit {
                requests_per_minute: 500,
                tokens_per_minute: Some(200_000),
                tokens_per_day: None,
            },
            priority: 4,
            enabled: true,
        },
    ]
}

impl Config {
    /// Load config from `$RAGRELAY_CONFIG` or the default path, then apply
    /// overrides from the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("RAGRELAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a YAML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            Ok(config)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(env) = lookup("RAGRELAY_ENV").and_then(|v| Environment::parse(&v)) {
            self.environment = env;
        }
        if let Some(order) = lookup("RAGRELAY_PROVIDER_PRIORITY") {
            self.router.priority_override = parse_list(&order);
        }
        if let Some(order) = lookup("RAGRELAY_EMBEDDING_PROVIDERS") {
            self.embedding.providers = parse_list(&order);
        }
        if let Some(disabled) = lookup("RAGRELAY_DISABLE_EMBEDDING_PROVIDERS") {
            self.embedding.disabled = parse_list(&disabled);
        }
        if let Some(threshold) = lookup("RAGRELAY_SIMILARITY_THRESHOLD") {
            match threshold.trim().parse::<f32>() {
                Ok(t) => self.search.similarity_threshold = t,
                Err(_) => tracing::warn!("Ignoring invalid similarity threshold: {}", threshold),
            }
        }
        if let Some(flag) = lookup("RAGRELAY_ALLOW_DEGRADED_EMBEDDINGS") {
            self.embedding.allow_degraded = parse_flag(&flag);
        }
        if let Some(dims) = lookup("RAGRELAY_EMBEDDING_DIMS").and_then(|s| s.trim().parse().ok()) {
            self.embedding.dimensions = dims;
        }
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.search.similarity_threshold) {
            return Err(RelayError::Config(format!(
                "similarity threshold {} outside [0, 1]",
                self.search.similarity_threshold
            )));
        }
        if self.chunking.max_words == 0 || self.chunking.overlap >= self.chunking.max_words {
            return Err(RelayError::Config(format!(
                "chunk overlap ({}) must be smaller than max words ({})",
                self.chunking.overlap, self.chunking.max_words
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(RelayError::Config("embedding dimensions must be > 0".to_string()));
        }
        let mut names = std::collections::HashSet::new();
        for provider in &self.providers {
            if !names.insert(provider.name.as_str()) {
                return Err(RelayError::Config(format!(
                    "duplicate provider name: {}",
                    provider.name
                )));
            }
        }
        Ok(())
    }

    /// Degraded embedding vectors are allowed
    pub fn degraded_embeddings_allowed(&self) -> bool {
        self.embedding.allow_degraded || !self.environment.is_production()
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.providers.len(), 4);
        assert!(config.environment.is_production());
        assert!(!config.degraded_embeddings_allowed());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides_with(lookup_from(&[
            ("RAGRELAY_ENV", "test"),
            ("RAGRELAY_PROVIDER_PRIORITY", "openai, Groq"),
            ("RAGRELAY_DISABLE_EMBEDDING_PROVIDERS", "gemini"),
            ("RAGRELAY_SIMILARITY_THRESHOLD", "0.72"),
            ("RAGRELAY_ALLOW_DEGRADED_EMBEDDINGS", "yes"),
        ]));

        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.router.priority_override, vec!["openai", "groq"]);
        assert_eq!(config.embedding.disabled, vec!["gemini"]);
        assert!((config.search.similarity_threshold - 0.72).abs() < f32::EPSILON);
        assert!(config.embedding.allow_degraded);
    }

    #[test]
    fn test_invalid_threshold_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides_with(lookup_from(&[("RAGRELAY_SIMILARITY_THRESHOLD", "high")]));
        assert!((config.search.similarity_threshold - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_rejects_bad_chunking() {
        let mut config = Config::default();
        config.chunking.overlap = config.chunking.max_words;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credential_resolution() {
        let provider = &Config::default().providers[0];
        let present = lookup_from(&[("GROQ_API_KEY", "gsk-test")]);
        let blank = lookup_from(&[("GROQ_API_KEY", "  ")]);
        assert_eq!(provider.credential_with(&present), Some("gsk-test".to_string()));
        assert_eq!(provider.credential_with(&blank), None);
    }

    #[test]
    fn test_load_from_yaml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            r#"
environment: development
providers:
  - name: local
    endpoint: http://localhost:8000/v1
    model: llama
    priority: 1
    rate_limit:
      requests_per_minute: 10
search:
  similarity_threshold: 0.5
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].shape, ProviderShape::Standard);
        assert!(!config.providers[0].requires_credential());
        assert_eq!(config.chunking.max_words, 400);
        assert!(config.degraded_embeddings_allowed());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.providers.len(), 4);
    }
}
