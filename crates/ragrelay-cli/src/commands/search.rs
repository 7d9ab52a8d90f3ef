//! Search command

use super::load_knowledge;
use crate::app::{OutputFormat, SearchArgs};
use crate::output::{self, FormatOptions};
use anyhow::Result;
use ragrelay_core::RagPipeline;

pub async fn run(args: SearchArgs, pipeline: &RagPipeline, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    load_knowledge(pipeline, &args.knowledge, format).await?;

    let limit = args
        .limit
        .unwrap_or(pipeline.config().search.default_limit);
    let results = pipeline
        .search_knowledge(&query, &args.knowledge.tenant, limit, args.threshold)
        .await;

    if results.is_empty() && matches!(format, OutputFormat::Cli) {
        println!("No results found");
        return Ok(());
    }

    let options = FormatOptions { full: args.full };
    print!("{}", output::format_search_results(&results, format, &options));
    Ok(())
}
