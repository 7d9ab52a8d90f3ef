//! Embedding progress on stderr

use ragrelay_core::index::EmbedProgress;
use ragrelay_core::EmbedStats;
use std::io::{self, Write};

/// Progress reporter for bulk embedding
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    total: usize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self { total }
    }

    pub fn update(&self, progress: &EmbedProgress) {
        eprint!(
            "\rEmbedding: {}/{} chunks ({} failed)   ",
            progress.processed_chunks, self.total, progress.failed_chunks
        );
        io::stderr().flush().ok();
    }

    pub fn finish(&self, stats: &EmbedStats) {
        if stats.halted {
            eprintln!(
                "\rEmbedding stopped after {}/{} chunks; using keyword search",
                stats.embedded_chunks, self.total
            );
        } else {
            eprintln!("\rEmbedded {}/{} chunks                    ", stats.embedded_chunks, self.total);
        }
    }
}
