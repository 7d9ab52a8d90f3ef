//! Shared helpers for integration tests: a scripted in-process transport
//! and provider builders

#![allow(dead_code)]

use async_trait::async_trait;
use ragrelay_core::error::{FailureKind, ProviderFailure};
use ragrelay_core::llm::{ProviderRequest, ProviderResponse, ProviderTransport};
use ragrelay_core::{ProviderDescriptor, ProviderShape, RateLimit};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// What a scripted provider does when called
#[derive(Debug, Clone)]
pub enum Reply {
    /// HTTP status with a raw body
    Status(u16, String),
    /// 200 with a JSON body
    Json(Value),
    /// 200 with a raw, possibly non-JSON body
    Raw(String),
    /// Never answers within any sane deadline
    Hang,
    /// Connection-level failure
    Refused,
}

impl Reply {
    pub fn rate_limited() -> Self {
        Reply::Status(429, r#"{"error":{"message":"Rate limit reached"}}"#.to_string())
    }

    pub fn quota_exhausted() -> Self {
        Reply::Status(
            429,
            r#"{"error":{"code":"insufficient_quota","message":"You exceeded your current quota"}}"#
                .to_string(),
        )
    }

    pub fn unauthorized() -> Self {
        Reply::Status(401, r#"{"error":"invalid api key"}"#.to_string())
    }

    pub fn chat(text: &str, tokens: u64) -> Self {
        Reply::Json(json!({
            "choices": [{"message": {"role": "assistant", "content": text}}],
            "usage": {"total_tokens": tokens}
        }))
    }

    pub fn embedding(vector: &[f32]) -> Self {
        Reply::Json(json!({"data": [{"embedding": vector}]}))
    }
}

/// Transport replaying scripted replies per provider and counting calls.
///
/// Queued replies are consumed in order; the last one repeats.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<(String, ProviderRequest)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, provider: &str, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(provider.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self, provider: &str) -> usize {
        self.calls.lock().unwrap().get(provider).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn requests(&self) -> Vec<(String, ProviderRequest)> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, provider: &str) -> Option<Reply> {
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(provider)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl ProviderTransport for ScriptedTransport {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        request: ProviderRequest,
    ) -> Result<ProviderResponse, ProviderFailure> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(provider.name.clone())
            .or_default() += 1;
        self.requests
            .lock()
            .unwrap()
            .push((provider.name.clone(), request));

        match self.next_reply(&provider.name) {
            Some(Reply::Status(status, body)) => Ok(ProviderResponse { status, body }),
            Some(Reply::Json(body)) => Ok(ProviderResponse::ok(body.to_string())),
            Some(Reply::Raw(body)) => Ok(ProviderResponse::ok(body)),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderFailure::timeout(&provider.name))
            }
            Some(Reply::Refused) | None => Err(ProviderFailure::new(
                &provider.name,
                FailureKind::Unclassified,
                "connection refused",
            )),
        }
    }
}

/// Standard-shape chat provider with a credential
pub fn chat_provider(name: &str, priority: u32) -> ProviderDescriptor {
    ProviderDescriptor::new(
        name,
        format!("https://{}.test/v1", name),
        ProviderShape::Standard,
        format!("{}-model", name),
    )
    .with_priority(priority)
    .with_credential("test-key")
    .with_rate_limit(RateLimit::per_minute(100))
}

/// Standard-shape provider that also serves embeddings
pub fn embedding_provider(name: &str, priority: u32) -> ProviderDescriptor {
    chat_provider(name, priority).with_embedding_model(format!("{}-embed", name))
}
