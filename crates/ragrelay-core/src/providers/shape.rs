//! Request/response shapes
//!
//! `Standard` is the OpenAI-compatible `chat/completions` + `embeddings`
//! wire format. `Alternate` is the Gemini-style `generateContent` +
//! `embedContent` format with `contents`/`parts` and a `model` role.

use super::ProviderDescriptor;
use crate::llm::{ChatMessage, Completion, GenerationOptions, ProviderRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// Shape tag as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderShape {
    #[default]
    Standard,
    #[serde(alias = "alternate-shape")]
    Alternate,
}

impl ProviderShape {
    /// Adapter implementing this shape
    pub fn adapter(self) -> Arc<dyn ShapeAdapter> {
        match self {
            Self::Standard => Arc::new(StandardAdapter),
            Self::Alternate => Arc::new(AlternateAdapter),
        }
    }
}

/// Builds provider requests and normalizes provider responses
pub trait ShapeAdapter: Send + Sync {
    fn chat_request(
        &self,
        provider: &ProviderDescriptor,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> ProviderRequest;

    /// Extract the completion text and token usage (0 when absent)
    fn parse_chat(&self, body: &Value) -> Result<Completion, String>;

    fn embed_request(&self, provider: &ProviderDescriptor, text: &str) -> ProviderRequest;

    /// Extract the raw vector entries; validation happens in the generator
    fn parse_embedding(&self, body: &Value) -> Result<Vec<Value>, String>;
}

fn bearer_headers(provider: &ProviderDescriptor) -> Vec<(String, String)> {
    provider
        .credential()
        .map(|key| vec![("Authorization".to_string(), format!("Bearer {}", key))])
        .unwrap_or_default()
}

/// OpenAI-compatible shape
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAdapter;

impl ShapeAdapter for StandardAdapter {
    fn chat_request(
        &self,
        provider: &ProviderDescriptor,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> ProviderRequest {
        let mut body = json!({
            "model": provider.model,
            "messages": messages,
        });
        if let Some(t) = options.temperature {
            body["temperature"] = json!(t);
        }
        if let Some(max) = options.max_tokens {
            body["max_tokens"] = json!(max);
        }
        if let Some(p) = options.top_p {
            body["top_p"] = json!(p);
        }

        ProviderRequest {
            url: format!("{}/chat/completions", provider.endpoint),
            headers: bearer_headers(provider),
            body,
        }
    }

    fn parse_chat(&self, body: &Value) -> Result<Completion, String> {
        let text = body["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| "missing choices[0].message.content".to_string())?;

        let usage = &body["usage"];
        let tokens_used = usage["total_tokens"].as_u64().unwrap_or_else(|| {
            usage["prompt_tokens"].as_u64().unwrap_or(0)
                + usage["completion_tokens"].as_u64().unwrap_or(0)
        });

        Ok(Completion {
            text: text.to_string(),
            tokens_used,
        })
    }

    fn embed_request(&self, provider: &ProviderDescriptor, text: &str) -> ProviderRequest {
        ProviderRequest {
            url: format!("{}/embeddings", provider.endpoint),
            headers: bearer_headers(provider),
            body: json!({
                "model": provider.embedding_model(),
                "input": text,
            }),
        }
    }

    fn parse_embedding(&self, body: &Value) -> Result<Vec<Value>, String> {
        body["data"]
            .get(0)
            .and_then(|d| d["embedding"].as_array())
            .cloned()
            .ok_or_else(|| "missing data[0].embedding".to_string())
    }
}

/// Gemini-style shape
#[derive(Debug, Clone, Copy, Default)]
pub struct AlternateAdapter;

impl AlternateAdapter {
    fn headers(provider: &ProviderDescriptor) -> Vec<(String, String)> {
        provider
            .credential()
            .map(|key| vec![("x-goog-api-key".to_string(), key.to_string())])
            .unwrap_or_default()
    }

    fn role(role: &str) -> &'static str {
        match role {
            "assistant" | "model" => "model",
            _ => "user",
        }
    }
}

impl ShapeAdapter for AlternateAdapter {
    fn chat_request(
        &self,
        provider: &ProviderDescriptor,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> ProviderRequest {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect();

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| {
                json!({
                    "role": Self::role(&m.role),
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        let mut generation_config = serde_json::Map::new();
        if let Some(t) = options.temperature {
            generation_config.insert("temperature".to_string(), json!(t));
        }
        if let Some(max) = options.max_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max));
        }
        if let Some(p) = options.top_p {
            generation_config.insert("topP".to_string(), json!(p));
        }

        let mut body = json!({ "contents": contents });
        if !system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
        }
        if !generation_config.is_empty() {
            body["generationConfig"] = Value::Object(generation_config);
        }

        ProviderRequest {
            url: format!(
                "{}/models/{}:generateContent",
                provider.endpoint, provider.model
            ),
            headers: Self::headers(provider),
            body,
        }
    }

    fn parse_chat(&self, body: &Value) -> Result<Completion, String> {
        let parts = body["candidates"]
            .get(0)
            .and_then(|c| c["content"]["parts"].as_array())
            .ok_or_else(|| "missing candidates[0].content.parts".to_string())?;

        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err("candidate contains no text parts".to_string());
        }

        Ok(Completion {
            text,
            tokens_used: body["usageMetadata"]["totalTokenCount"]
                .as_u64()
                .unwrap_or(0),
        })
    }

    fn embed_request(&self, provider: &ProviderDescriptor, text: &str) -> ProviderRequest {
        let model = provider.embedding_model();
        ProviderRequest {
            url: format!("{}/models/{}:embedContent", provider.endpoint, model),
            headers: Self::headers(provider),
            body: json!({
                "model": format!("models/{}", model),
                "content": { "parts": [{ "text": text }] },
            }),
        }
    }

    fn parse_embedding(&self, body: &Value) -> Result<Vec<Value>, String> {
        body["embedding"]["values"]
            .as_array()
            .cloned()
            .ok_or_else(|| "missing embedding.values".to_string())
    }
}
