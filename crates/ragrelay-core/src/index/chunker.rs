//! Document chunking for embedding

/// Chunking configuration
pub const DEFAULT_MAX_WORDS: usize = 400;
pub const DEFAULT_OVERLAP_WORDS: usize = 50;

/// Document chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Word offset of the first word in the source text
    pub position: usize,
    pub word_count: usize,
}

/// Sliding word window. Every chunk but the last holds exactly `max_words`
/// words; consecutive chunks share `overlap` words.
pub fn chunk_text(content: &str, max_words: usize, overlap: usize) -> Vec<Chunk> {
    let words: Vec<&str> = content.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let max_words = max_words.max(1);
    let step = max_words.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + max_words).min(words.len());
        chunks.push(Chunk {
            text: words[start..end].join(" "),
            position: start,
            word_count: end - start,
        });

        if end >= words.len() {
            break;
        }
        start += step;
    }

    chunks
}
