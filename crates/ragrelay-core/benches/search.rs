//! Search performance benchmarks
//!
//! Measures performance of:
//! - Cosine scoring over a tenant's candidate pool
//! - Keyword fallback scoring
//! - Word-window chunking

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ragrelay_core::llm::degraded_vector;
use ragrelay_core::search::{extract_tokens, keyword_search, vector_search};
use ragrelay_core::{chunk_text, KnowledgeChunk};

const DIMENSIONS: usize = 384;

const SAMPLE_TEXTS: &[&str] = &[
    "Refunds are accepted within 30 days of purchase with the original receipt.",
    "Shipping usually takes three to five business days within the country.",
    "You can reach support through the chat widget or by email at any time.",
    "Subscriptions renew automatically unless cancelled before the billing date.",
    "Passwords can be reset from the login page using the forgot password link.",
    "Orders over fifty dollars ship for free to any address in the region.",
];

fn make_chunks(count: usize, embedded: bool) -> Vec<KnowledgeChunk> {
    (0..count)
        .map(|i| {
            let text = format!("{} (variant {})", SAMPLE_TEXTS[i % SAMPLE_TEXTS.len()], i);
            let chunk = KnowledgeChunk::new("bench", format!("doc-{}", i / 10), i, text.clone(), "faq")
                .with_created_at(Utc::now() - Duration::seconds(i as i64));
            if embedded {
                chunk.with_embedding(degraded_vector(&text, DIMENSIONS))
            } else {
                chunk
            }
        })
        .collect()
}

fn bench_vector_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("vector_search");
    let query = degraded_vector("how do refunds work", DIMENSIONS);

    for size in [100, 1_000, 2_000] {
        let chunks = make_chunks(size, true);
        group.bench_with_input(BenchmarkId::from_parameter(size), &chunks, |b, chunks| {
            b.iter(|| vector_search(black_box(&query), black_box(chunks), 0.0, 5, 2_000))
        });
    }

    group.finish();
}

fn bench_keyword_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyword_search");
    let tokens = extract_tokens("refund policy for shipping orders");

    for size in [100, 1_000, 5_000] {
        let chunks = make_chunks(size, false);
        group.bench_with_input(BenchmarkId::from_parameter(size), &chunks, |b, chunks| {
            b.iter(|| keyword_search(black_box(&tokens), black_box(chunks), 5))
        });
    }

    group.finish();
}

fn bench_chunking(c: &mut Criterion) {
    let document = SAMPLE_TEXTS.join(" ").repeat(200);
    c.bench_function("chunk_text_400_50", |b| {
        b.iter(|| chunk_text(black_box(&document), 400, 50))
    });
}

criterion_group!(benches, bench_vector_search, bench_keyword_search, bench_chunking);
criterion_main!(benches);
