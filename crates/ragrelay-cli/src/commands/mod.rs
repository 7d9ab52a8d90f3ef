//! CLI command handlers

pub mod ask;
pub mod chunk;
pub mod embed;
pub mod providers;
pub mod search;

use crate::app::{KnowledgeArgs, OutputFormat};
use crate::progress::ProgressReporter;
use anyhow::{Context, Result};
use ragrelay_core::index::EmbedProgress;
use ragrelay_core::RagPipeline;
use std::path::Path;

/// Ingest the requested documents and embed their chunks when an
/// embedding provider is configured. Returns the number of chunks stored.
pub async fn load_knowledge(
    pipeline: &RagPipeline,
    args: &KnowledgeArgs,
    format: OutputFormat,
) -> Result<usize> {
    let mut total = 0;
    for path in &args.docs {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let chunks = pipeline
            .ingest(&args.tenant, &document_id(path), &source_type(path), &content)
            .await?;
        tracing::debug!(doc = %path.display(), chunks = chunks.len(), "Ingested document");
        total += chunks.len();
    }

    if args.no_embed || total == 0 || pipeline.embeddings().providers().is_empty() {
        return Ok(total);
    }

    let show_progress = matches!(format, OutputFormat::Cli);
    let reporter = ProgressReporter::new(total);
    let progress: Option<Box<dyn Fn(EmbedProgress) + Send + Sync>> = if show_progress {
        Some(Box::new(move |p: EmbedProgress| reporter.update(&p)))
    } else {
        None
    };

    let stats = pipeline.embed_missing(&args.tenant, progress).await?;
    if show_progress {
        reporter.finish(&stats);
    }
    Ok(total)
}

fn document_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn source_type(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "text".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_and_source_type() {
        let path = Path::new("/tmp/docs/refunds.MD");
        assert_eq!(document_id(path), "refunds.MD");
        assert_eq!(source_type(path), "md");
        assert_eq!(source_type(Path::new("NOTES")), "text");
    }
}
