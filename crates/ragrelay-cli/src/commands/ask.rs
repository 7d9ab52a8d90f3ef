//! Ask command

use super::load_knowledge;
use crate::app::{AskArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use ragrelay_core::{GenerationOptions, RagPipeline};

pub async fn run(args: AskArgs, pipeline: &RagPipeline, format: OutputFormat) -> Result<()> {
    let question = args.question.join(" ");
    load_knowledge(pipeline, &args.knowledge, format).await?;

    let options = GenerationOptions {
        temperature: args.temperature,
        max_tokens: args.max_tokens,
        top_p: None,
    };
    let answer = pipeline
        .answer(&args.knowledge.tenant, &question, &[], &options)
        .await?;

    print!("{}", output::format_answer(&answer, format));
    Ok(())
}
