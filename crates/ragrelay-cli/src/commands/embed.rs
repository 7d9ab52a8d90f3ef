//! Embed command

use crate::app::{EmbedArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use ragrelay_core::RagPipeline;

pub async fn run(args: EmbedArgs, pipeline: &RagPipeline, format: OutputFormat) -> Result<()> {
    let text = args.text.join(" ");
    let outcome = pipeline.embeddings().generate(&text).await;
    print!("{}", output::format_embedding(&outcome, format));
    Ok(())
}
