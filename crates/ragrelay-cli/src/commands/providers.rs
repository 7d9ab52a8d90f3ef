//! Providers command

use crate::app::OutputFormat;
use crate::output::{self, ProviderReport};
use anyhow::Result;
use ragrelay_core::RagPipeline;

pub async fn run(pipeline: &RagPipeline, format: OutputFormat) -> Result<()> {
    let report = ProviderReport::collect(pipeline);
    print!("{}", output::format_providers(&report, format));
    Ok(())
}
