//! Indexing pipeline
//!
//! Word-window chunking, document ingestion and bulk embedding.

mod chunker;
mod embedder;

pub use chunker::*;
pub use embedder::*;
