//! Chunk command

use crate::app::{ChunkArgs, OutputFormat};
use crate::output;
use anyhow::{bail, Context, Result};
use ragrelay_core::{chunk_text, RagPipeline};

pub async fn run(args: ChunkArgs, pipeline: &RagPipeline, format: OutputFormat) -> Result<()> {
    let chunking = &pipeline.config().chunking;
    let max_words = args.max_words.unwrap_or(chunking.max_words);
    let overlap = args.overlap.unwrap_or(chunking.overlap);
    if max_words == 0 || overlap >= max_words {
        bail!(
            "overlap ({}) must be smaller than max words ({})",
            overlap,
            max_words
        );
    }

    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let chunks = chunk_text(&content, max_words, overlap);

    print!("{}", output::format_chunks(&chunks, format));
    Ok(())
}
