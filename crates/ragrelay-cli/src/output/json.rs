//! JSON output formatter

use super::{FormatOptions, ProviderReport};
use ragrelay_core::{Answer, Chunk, EmbeddingOutcome, SearchResult};
use serde_json::Value;

fn result_value(r: &SearchResult, full: bool) -> Value {
    let mut value = serde_json::json!({
        "chunk_id": r.chunk.id,
        "document_id": r.chunk.document_id,
        "index": r.chunk.metadata.index,
        "source_type": r.chunk.metadata.source_type,
        "score": r.score,
        "source": r.source,
        "relevance": r.relevance(),
    });
    if let Some(rerank_score) = r.rerank_score {
        value["rerank_score"] = rerank_score.into();
    }
    if full {
        value["content"] = r.chunk.content.clone().into();
    }
    value
}

fn pretty(value: &Value, empty: &str) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| empty.to_string()) + "\n"
}

pub fn format_results(results: &[SearchResult], options: &FormatOptions) -> String {
    let output: Vec<Value> = results
        .iter()
        .map(|r| result_value(r, options.full))
        .collect();

    pretty(&Value::Array(output), "[]")
}

pub fn format_chunks(chunks: &[Chunk]) -> String {
    let output: Vec<Value> = chunks
        .iter()
        .enumerate()
        .map(|(i, c)| {
            serde_json::json!({
                "index": i,
                "position": c.position,
                "word_count": c.word_count,
                "text": c.text,
            })
        })
        .collect();

    pretty(&Value::Array(output), "[]")
}

pub fn format_answer(answer: &Answer) -> String {
    let sources: Vec<Value> = answer
        .sources
        .iter()
        .map(|r| result_value(r, false))
        .collect();
    let output = serde_json::json!({
        "text": answer.result.text,
        "provider": answer.result.provider_name,
        "model": answer.result.model_id,
        "tokens_used": answer.result.tokens_used,
        "sources": sources,
    });

    pretty(&output, "{}")
}

pub fn format_embedding(outcome: &EmbeddingOutcome) -> String {
    let output = match outcome {
        EmbeddingOutcome::Provider { vector, provider } => serde_json::json!({
            "status": "provider",
            "provider": provider,
            "dimensions": vector.len(),
            "embedding": vector,
        }),
        EmbeddingOutcome::Degraded(vector) => serde_json::json!({
            "status": "degraded",
            "dimensions": vector.len(),
            "embedding": vector,
        }),
        EmbeddingOutcome::Unavailable => serde_json::json!({ "status": "unavailable" }),
    };

    pretty(&output, "{}")
}

pub fn format_providers(report: &ProviderReport) -> String {
    match serde_json::to_value(report) {
        Ok(value) => pretty(&value, "{}"),
        Err(_) => "{}\n".to_string(),
    }
}
