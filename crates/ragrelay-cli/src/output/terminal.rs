//! Terminal output formatter

use super::{FormatOptions, ProviderReport};
use ragrelay_core::{Answer, Chunk, EmbeddingOutcome, Environment, SearchResult};

const SNIPPET_LINES: usize = 3;
const PREVIEW_VALUES: usize = 8;

pub fn format_results(results: &[SearchResult], options: &FormatOptions) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut output = String::new();

    for result in results {
        let score_pct = (result.relevance() * 100.0) as u32;
        output.push_str(&format!(
            "{:>3}% {:<7} {}#{}\n",
            score_pct,
            result.source.as_str(),
            result.chunk.document_id,
            result.chunk.metadata.index
        ));

        if options.full {
            for line in result.chunk.content.lines() {
                output.push_str(&format!("  {}\n", line));
            }
        } else {
            let lines: Vec<&str> = result.chunk.content.lines().take(SNIPPET_LINES).collect();
            for line in &lines {
                output.push_str(&format!("  {}\n", line));
            }
            if result.chunk.content.lines().count() > SNIPPET_LINES {
                output.push_str("  ...\n");
            }
        }
    }

    output
}

pub fn format_chunks(chunks: &[Chunk]) -> String {
    let mut output = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        output.push_str(&format!(
            "--- chunk {} (words {}-{}) ---\n{}\n",
            i + 1,
            chunk.position,
            chunk.position + chunk.word_count.saturating_sub(1),
            chunk.text
        ));
    }
    output.push_str(&format!("{} chunk(s)\n", chunks.len()));
    output
}

pub fn format_answer(answer: &Answer) -> String {
    let mut output = format!("{}\n", answer.result.text.trim_end());

    if !answer.sources.is_empty() {
        output.push_str("\nSources:\n");
        for (i, source) in answer.sources.iter().enumerate() {
            output.push_str(&format!(
                "  [{}] {}#{} ({}%)\n",
                i + 1,
                source.chunk.document_id,
                source.chunk.metadata.index,
                (source.relevance() * 100.0) as u32
            ));
        }
    }

    output.push_str(&format!(
        "\nvia {} ({}), {} tokens\n",
        answer.result.provider_name, answer.result.model_id, answer.result.tokens_used
    ));
    output
}

pub fn format_embedding(outcome: &EmbeddingOutcome) -> String {
    let (label, vector) = match outcome {
        EmbeddingOutcome::Provider { vector, provider } => (format!("provider {}", provider), vector),
        EmbeddingOutcome::Degraded(vector) => ("degraded (hash-derived, not persisted)".to_string(), vector),
        EmbeddingOutcome::Unavailable => {
            return "Embedding unavailable; search falls back to keyword matching\n".to_string()
        }
    };

    let preview: Vec<String> = vector
        .iter()
        .take(PREVIEW_VALUES)
        .map(|v| format!("{:.4}", v))
        .collect();
    let ellipsis = if vector.len() > PREVIEW_VALUES { ", ..." } else { "" };

    format!(
        "Source:     {}\nDimensions: {}\nVector:     [{}{}]\n",
        label,
        vector.len(),
        preview.join(", "),
        ellipsis
    )
}

pub fn format_providers(report: &ProviderReport) -> String {
    let mut output = format!("Environment: {}\n", environment_name(report.environment));
    output.push_str(&format!(
        "Degraded embeddings: {}\n",
        if report.degraded_embeddings { "allowed" } else { "off" }
    ));

    output.push_str("\nChat providers:\n");
    if report.chat.is_empty() {
        output.push_str("  (none)\n");
    }
    for status in &report.chat {
        output.push_str(&format!(
            "  {:<12} {:<40} priority {:<3} {}\n",
            status.name,
            status.model,
            status.priority,
            if status.available { "available" } else { "saturated" }
        ));
    }

    output.push_str("\nEmbedding providers:\n");
    if report.embedding.is_empty() {
        output.push_str("  (none)\n");
    }
    for status in &report.embedding {
        let state = match status.cooldown_secs {
            Some(secs) => format!("cooling down {}s", secs),
            None => "ready".to_string(),
        };
        output.push_str(&format!("  {:<12} {:<40} {}\n", status.name, status.model, state));
    }

    if !report.disabled.is_empty() {
        output.push_str(&format!("\nDisabled: {}\n", report.disabled.join(", ")));
    }
    output
}

fn environment_name(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "production",
        Environment::Development => "development",
        Environment::Test => "test",
    }
}
