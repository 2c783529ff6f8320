use crate::config::Settings;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::index::{IndexGateway, PineconeClient, QueryMatch};
use crate::ingest::{IngestOptions, IngestReport, Ingestor};
use crate::search::semantic_search;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Build the embedding client from settings
pub fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(OpenAiEmbedder::new(
        &settings.openai,
        &settings.upstream,
    )?))
}

/// Build the index gateway from settings
pub fn build_gateway(settings: &Settings) -> Result<IndexGateway> {
    let client = PineconeClient::new(&settings.pinecone, &settings.upstream)?;
    Ok(IndexGateway::new(
        Arc::new(client),
        settings.pinecone.upsert_batch_size,
    ))
}

/// Run the ingestion pipeline against the configured source file
pub async fn ingest(settings: &Settings) -> Result<IngestReport> {
    let embedder = build_embedder(settings)?;
    let gateway = build_gateway(settings)?;
    let ingestor = Ingestor::new(embedder, gateway, IngestOptions::from_settings(settings));

    info!(
        "Ingesting {} (limit {}, batch size {})",
        settings.ingest.source_file.display(),
        settings.ingest.record_limit,
        settings.ingest.batch_size
    );

    ingestor.run(&settings.ingest.source_file).await
}

/// Run one search with the configured clients
pub async fn search(settings: &Settings, query: &str, top_k: usize) -> Result<Vec<QueryMatch>> {
    let embedder = build_embedder(settings)?;
    let gateway = build_gateway(settings)?;

    semantic_search(
        embedder.as_ref(),
        &gateway,
        &settings.pinecone.index_name,
        query,
        top_k,
    )
    .await
}

pub fn print_report(report: &IngestReport) {
    println!("\nIngestion report for index '{}'", report.index_name);
    println!("========================================");
    println!(
        "Index:            {} (dimension {})",
        if report.index_created {
            "created"
        } else {
            "existing"
        },
        report.dimension
    );
    println!("Rows read:        {}", report.records_read);
    println!("Records indexed:  {}", report.records_indexed);
    println!("Vectors upserted: {}", report.vectors_upserted);
    println!("Batches:          {}", report.batches);
    println!(
        "Duration:         {}s",
        (report.finished_at - report.started_at).num_seconds()
    );

    if report.is_success() {
        println!("\n\x1b[32m\u{2713}\x1b[0m All records indexed");
        return;
    }

    println!("\n\x1b[31m\u{2717}\x1b[0m {} records failed:", report.failed.len());
    for failure in &report.failed {
        println!("  {} [{}] {}", failure.record_id, failure.stage, failure.message);
    }
}

pub fn print_matches(query: &str, matches: &[QueryMatch]) {
    if matches.is_empty() {
        println!("No matches for \"{query}\"");
        return;
    }

    println!("Top {} matches for \"{}\":\n", matches.len(), query);

    for (rank, m) in matches.iter().enumerate() {
        let name = m
            .metadata
            .as_ref()
            .map(|meta| meta.name.as_str())
            .unwrap_or("(no metadata)");
        println!("{}. {} [id {}] score {:.4}", rank + 1, name, m.id, m.score);

        if let Some(meta) = &m.metadata {
            if !meta.minutes.is_empty() {
                println!("   {} minutes", meta.minutes);
            }
            if !meta.tags.is_empty() {
                println!("   tags: {}", meta.tags.join(", "));
            }
            if !meta.description.is_empty() {
                println!("   {}", meta.description);
            }
        }
    }
}
