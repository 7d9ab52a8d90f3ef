//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragrelay")]
#[command(
    author,
    version,
    about = "Retrieval-augmented answers over failover LLM providers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "RAGRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a document into overlapping word windows
    Chunk(ChunkArgs),

    /// Search documents for a query
    Search(SearchArgs),

    /// Answer a question grounded on documents
    Ask(AskArgs),

    /// Generate an embedding for a piece of text
    Embed(EmbedArgs),

    /// Show configured providers and their availability
    Providers,
}

#[derive(Args)]
pub struct ChunkArgs {
    /// Document to chunk
    pub file: PathBuf,

    /// Words per chunk (defaults to config)
    #[arg(long)]
    pub max_words: Option<usize>,

    /// Words shared by consecutive chunks (defaults to config)
    #[arg(long)]
    pub overlap: Option<usize>,
}

/// Documents loaded into the knowledge store before a query runs
#[derive(Args)]
pub struct KnowledgeArgs {
    /// Document to ingest (repeatable)
    #[arg(short, long = "doc", required = true)]
    pub docs: Vec<PathBuf>,

    /// Tenant the documents belong to
    #[arg(long, default_value = "default")]
    pub tenant: String,

    /// Skip embedding documents; retrieval uses keyword matching
    #[arg(long)]
    pub no_embed: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    #[command(flatten)]
    pub knowledge: KnowledgeArgs,

    /// Number of results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Minimum cosine similarity for vector results
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Show full chunk content
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct AskArgs {
    /// Question to answer
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    #[command(flatten)]
    pub knowledge: KnowledgeArgs,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

#[derive(Args)]
pub struct EmbedArgs {
    /// Text to embed
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
