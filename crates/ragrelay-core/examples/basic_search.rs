// Basic search example using ragrelay as a library

use ragrelay_core::{Config, MemoryStore, RagPipeline};
use std::sync::Arc;

#[tokio::main]
async fn main() -> ragrelay_core::Result<()> {
    println!("Ragrelay Basic Search Example\n");

    // No providers: retrieval runs on keyword matching alone
    let config = Config {
        providers: Vec::new(),
        ..Config::default()
    };
    let pipeline = RagPipeline::from_config(config, Arc::new(MemoryStore::new()))?;

    println!("Ingesting sample documents...");
    let documents = [
        (
            "refunds.md",
            "Customers can request a refund within 30 days of purchase. \
             Refunds are returned to the original payment method.",
        ),
        (
            "shipping.md",
            "Orders ship within two business days. Express shipping is \
             available at checkout for an extra fee.",
        ),
        (
            "support.md",
            "Contact support by email or chat. Support answers within one business day.",
        ),
    ];
    for (doc, content) in documents {
        let chunks = pipeline.ingest("example", doc, "md", content).await?;
        println!("  {} -> {} chunk(s)", doc, chunks.len());
    }

    println!("\nSearching for 'refund payment'...");
    let results = pipeline
        .search_knowledge("refund payment", "example", 5, None)
        .await;

    if results.is_empty() {
        println!("No results found.");
    } else {
        println!("Found {} results:\n", results.len());
        for (i, result) in results.iter().enumerate() {
            println!(
                "{}. {}#{} (score: {:.2}, {})",
                i + 1,
                result.chunk.document_id,
                result.chunk.metadata.index,
                result.relevance(),
                result.source.as_str()
            );
            println!("   {}", result.chunk.content);
            println!();
        }
    }

    println!("Asking without any provider configured...");
    match pipeline
        .answer("example", "How long do refunds take?", &[], &Default::default())
        .await
    {
        Ok(answer) => println!("{}", answer.result.text),
        Err(e) => println!("{}", e.user_message()),
    }

    Ok(())
}
