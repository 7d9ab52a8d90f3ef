//! Error types for ragrelay

use std::fmt;
use thiserror::Error;

/// Result type alias using RelayError
pub type Result<T> = std::result::Result<T, RelayError>;

/// Error type alias for convenience
pub type Error = RelayError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const UNAVAILABLE: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Generic outcome shown to end users when generation is impossible
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service temporarily unavailable, please retry.";

/// Main error type for ragrelay
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Rate limited by provider {0}")]
    RateLimited(String),

    #[error("Authentication rejected by provider {0}")]
    Auth(String),

    #[error("Provider {0} timed out")]
    Timeout(String),

    #[error("Malformed response from provider {provider}: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("No provider available")]
    NoProviderAvailable,

    #[error("All providers exhausted after {attempts} attempt(s)")]
    AllProvidersExhausted { attempts: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoProviderAvailable | Self::AllProvidersExhausted { .. } => {
                exit_codes::UNAVAILABLE
            }
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// True when no provider could produce a result
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::NoProviderAvailable | Self::AllProvidersExhausted { .. }
        )
    }

    /// Message safe to show to the end user of a chat turn
    pub fn user_message(&self) -> String {
        if self.is_unavailable() {
            SERVICE_UNAVAILABLE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Classification of a single failed provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    RateLimit,
    Auth,
    Timeout,
    Malformed,
    Unclassified,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimit => "RATE_LIMIT",
            Self::Auth => "AUTH_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Malformed => "MALFORMED_RESPONSE",
            Self::Unclassified => "UNCLASSIFIED",
        }
    }

    /// Classify an HTTP status plus response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            429 => Self::RateLimit,
            401 | 403 => Self::Auth,
            408 | 504 => Self::Timeout,
            _ if mentions_quota(body) => Self::RateLimit,
            _ => Self::Unclassified,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn mentions_quota(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
        || lower.contains("too many requests")
}

/// A failed attempt against one provider. Recovered locally by the
/// router and the embedding generator, never surfaced individually.
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn from_status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        Self {
            provider: provider.into(),
            kind: FailureKind::from_status(status, body),
            status: Some(status),
            message: truncate_body(body),
        }
    }

    pub fn timeout(provider: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Timeout, "deadline exceeded")
    }

    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, FailureKind::Malformed, message)
    }

    /// Quota fully spent or a credential flagged as leaked
    pub fn is_hard_quota(&self) -> bool {
        let lower = self.message.to_lowercase();
        let leaked = lower.contains("leaked") || lower.contains("compromised");
        match self.kind {
            FailureKind::RateLimit => {
                leaked
                    || lower.contains("insufficient_quota")
                    || lower.contains("exceeded your current quota")
                    || lower.contains("quota has been exhausted")
                    || lower.contains("billing")
            }
            FailureKind::Auth => leaked,
            _ => false,
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} from {} (HTTP {}): {}",
                self.kind, self.provider, status, self.message
            ),
            None => write!(f, "{} from {}: {}", self.kind, self.provider, self.message),
        }
    }
}

impl From<ProviderFailure> for RelayError {
    fn from(failure: ProviderFailure) -> Self {
        match failure.kind {
            FailureKind::RateLimit => Self::RateLimited(failure.provider),
            FailureKind::Auth => Self::Auth(failure.provider),
            FailureKind::Timeout => Self::Timeout(failure.provider),
            FailureKind::Malformed | FailureKind::Unclassified => Self::MalformedResponse {
                provider: failure.provider,
                message: failure.message,
            },
        }
    }
}

fn truncate_body(body: &str) -> String {
    const MAX_BODY: usize = 300;
    if body.len() <= MAX_BODY {
        return body.to_string();
    }
    let mut end = MAX_BODY;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
