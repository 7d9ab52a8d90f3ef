//! LLM-based reranker
//!
//! Asks a chat provider for a relevance score per candidate. Any parse
//! problem is reported as an error; callers treat that as "keep the
//! original order".

use super::{ChatCompleter, ChatMessage, GenerationOptions, RerankDocument, RerankResult, Reranker};
use crate::error::{RelayError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of candidates scored in one call
pub const DEFAULT_RERANK_BATCH: usize = 10;

/// Default characters of candidate text included in the prompt
pub const DEFAULT_RERANK_TEXT_CHARS: usize = 400;

/// Reranker using a chat completion call
pub struct LlmReranker {
    client: Arc<dyn ChatCompleter>,
    max_docs: usize,
    max_chars: usize,
}

impl LlmReranker {
    /// Create from chat client
    pub fn new(client: Arc<dyn ChatCompleter>) -> Self {
        Self {
            client,
            max_docs: DEFAULT_RERANK_BATCH,
            max_chars: DEFAULT_RERANK_TEXT_CHARS,
        }
    }

    pub fn with_limits(mut self, max_docs: usize, max_chars: usize) -> Self {
        self.max_docs = max_docs.max(1);
        self.max_chars = max_chars.max(1);
        self
    }
}

#[async_trait]
impl Reranker for LlmReranker {
    async fn rerank(&self, query: &str, documents: &[RerankDocument]) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let docs_to_rerank = &documents[..documents.len().min(self.max_docs)];
        let prompt = build_reranking_prompt(query, docs_to_rerank, self.max_chars);

        let messages = vec![
            ChatMessage::system(
                "Score document relevance to the query. Output ONLY JSON: \
                 {\"scores\": [{\"id\": \"...\", \"score\": 0.0-1.0}, ...]}",
            ),
            ChatMessage::user(prompt),
        ];
        let options = GenerationOptions {
            temperature: Some(0.0),
            max_tokens: Some(512),
            top_p: None,
        };

        let response = self.client.complete(&messages, &options).await?;
        parse_reranking_response(&response.text, docs_to_rerank)
    }

    fn model_name(&self) -> &str {
        "llm-reranker"
    }
}

fn build_reranking_prompt(query: &str, documents: &[RerankDocument], max_chars: usize) -> String {
    let mut prompt = format!("Query: \"{}\"\nDocuments:\n", query);

    for doc in documents {
        let text = truncate_chars(&doc.text, max_chars);
        prompt.push_str(&format!("[{}] {}\n", doc.id, text.replace('\n', " ")));
    }

    prompt.push_str("\nReturn a score between 0 and 1 for every document id.\n");
    prompt
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Find the first JSON value shaped like a score list in a response that
/// may be wrapped in prose or a markdown fence. Bracketed text such as
/// "[2]" in the prose is skipped.
fn extract_scores(response: &str) -> Option<Vec<Value>> {
    for (start, _) in response.match_indices(['{', '[']) {
        let mut stream = serde_json::Deserializer::from_str(&response[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(mut obj))) => {
                if let Some(Value::Array(entries)) = obj.remove("scores") {
                    return Some(entries);
                }
            }
            Some(Ok(Value::Array(entries))) if entries.iter().any(|e| e.get("id").is_some()) => {
                return Some(entries);
            }
            _ => {}
        }
    }
    None
}

fn parse_reranking_response(
    response: &str,
    documents: &[RerankDocument],
) -> Result<Vec<RerankResult>> {
    let entries = extract_scores(response).ok_or_else(|| {
        tracing::debug!("Raw reranker response: {}", response);
        RelayError::InvalidInput("no score list in reranking response".to_string())
    })?;

    let mut scores: HashMap<String, f64> = HashMap::new();
    for entry in &entries {
        let id = match &entry["id"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        let score = match &entry["score"] {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        };
        scores.insert(id, if score.is_finite() { score } else { 0.0 });
    }

    if !documents.iter().any(|d| scores.contains_key(&d.id)) {
        return Err(RelayError::InvalidInput(
            "reranking response scored none of the candidates".to_string(),
        ));
    }

    Ok(documents
        .iter()
        .map(|doc| RerankResult {
            id: doc.id.clone(),
            score: scores.get(&doc.id).copied().unwrap_or(0.0),
        })
        .collect())
}
