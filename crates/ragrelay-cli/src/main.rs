//! Ragrelay CLI
//!
//! Chunk, search and answer over local documents using whichever LLM
//! providers are configured.

use anyhow::Result;
use clap::Parser;
use ragrelay_core::{Config, MemoryResponseCache, MemoryStore, RagPipeline, RelayError};
use std::path::Path;
use std::sync::Arc;

mod app;
mod commands;
mod output;
mod progress;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;
    let pipeline = RagPipeline::from_config(config, Arc::new(MemoryStore::new()))?
        .with_cache(Arc::new(MemoryResponseCache::new()));

    let result = match cli.command {
        Commands::Chunk(args) => commands::chunk::run(args, &pipeline, cli.format).await,
        Commands::Search(args) => commands::search::run(args, &pipeline, cli.format).await,
        Commands::Ask(args) => commands::ask::run(args, &pipeline, cli.format).await,
        Commands::Embed(args) => commands::embed::run(args, &pipeline, cli.format).await,
        Commands::Providers => commands::providers::run(&pipeline, cli.format).await,
    };

    if let Err(e) = result {
        if let Some(relay) = e.downcast_ref::<RelayError>() {
            eprintln!("Error: {}", relay.user_message());
            std::process::exit(relay.exit_code());
        }
        return Err(e);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load_from(&Config::default_path())?,
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}
