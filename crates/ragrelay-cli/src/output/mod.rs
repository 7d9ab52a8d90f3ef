//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use ragrelay_core::llm::ProviderStatus;
use ragrelay_core::{Answer, Chunk, EmbeddingOutcome, Environment, RagPipeline, SearchResult};
use serde::Serialize;

/// Format options
pub struct FormatOptions {
    pub full: bool,
}

/// Embedding provider as seen by the generator
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingStatus {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_secs: Option<u64>,
}

/// Provider availability at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct ProviderReport {
    pub environment: Environment,
    pub degraded_embeddings: bool,
    pub chat: Vec<ProviderStatus>,
    pub embedding: Vec<EmbeddingStatus>,
    /// Configured but disabled, usually for a missing credential
    pub disabled: Vec<String>,
}

impl ProviderReport {
    pub fn collect(pipeline: &RagPipeline) -> Self {
        let cooldowns = &pipeline.state().cooldowns;
        let embedding = pipeline
            .embeddings()
            .providers()
            .iter()
            .map(|p| EmbeddingStatus {
                name: p.name.clone(),
                model: p.embedding_model().to_string(),
                cooldown_secs: cooldowns.remaining(&p.name).map(|d| d.as_secs()),
            })
            .collect();
        let disabled = pipeline
            .registry()
            .all()
            .iter()
            .filter(|p| !p.enabled)
            .map(|p| p.name.clone())
            .collect();

        Self {
            environment: pipeline.config().environment,
            degraded_embeddings: pipeline.embeddings().degraded_mode(),
            chat: pipeline.router().status(),
            embedding,
            disabled,
        }
    }
}

/// Format search results
pub fn format_search_results(
    results: &[SearchResult],
    format: OutputFormat,
    options: &FormatOptions,
) -> String {
    match format {
        OutputFormat::Json => json::format_results(results, options),
        OutputFormat::Cli => terminal::format_results(results, options),
    }
}

pub fn format_chunks(chunks: &[Chunk], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_chunks(chunks),
        OutputFormat::Cli => terminal::format_chunks(chunks),
    }
}

pub fn format_answer(answer: &Answer, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_answer(answer),
        OutputFormat::Cli => terminal::format_answer(answer),
    }
}

pub fn format_embedding(outcome: &EmbeddingOutcome, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_embedding(outcome),
        OutputFormat::Cli => terminal::format_embedding(outcome),
    }
}

pub fn format_providers(report: &ProviderReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_providers(report),
        OutputFormat::Cli => terminal::format_providers(report),
    }
}
