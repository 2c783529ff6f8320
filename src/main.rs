use clap::Parser;
use recipe_search::{
    api::{handlers::AppState, routes},
    cli::{commands, Cli, Commands},
    config::Settings,
    Error, Result,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,recipe_search=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Ingest {
            file,
            limit,
            batch_size,
            concurrency,
            json,
        } => {
            ingest(settings, file, limit, batch_size, concurrency, json).await?;
        }
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Search { query, top_k } => {
            let top_k = top_k.unwrap_or(settings.server.top_k);
            let matches = commands::search(&settings, &query, top_k).await?;
            commands::print_matches(&query, &matches);
        }
    }

    Ok(())
}

async fn ingest(
    mut settings: Settings,
    file: Option<PathBuf>,
    limit: Option<usize>,
    batch_size: Option<usize>,
    concurrency: Option<usize>,
    json: bool,
) -> Result<()> {
    if let Some(file) = file {
        settings.ingest.source_file = file;
    }
    if let Some(limit) = limit {
        settings.ingest.record_limit = limit;
    }
    if let Some(batch_size) = batch_size {
        settings.ingest.batch_size = batch_size;
        if concurrency.is_none() {
            settings.ingest.concurrency = batch_size;
        }
    }
    if let Some(concurrency) = concurrency {
        settings.ingest.concurrency = concurrency;
    }
    settings.validate()?;

    let report = commands::ingest(&settings).await?;

    if json {
        let output = serde_json::to_string_pretty(&report)
            .map_err(|e| Error::Internal(format!("Failed to serialize report: {e}")))?;
        println!("{output}");
    } else {
        commands::print_report(&report);
    }

    if !report.is_success() {
        return Err(Error::Internal(format!(
            "{} of {} records failed",
            report.failed.len(),
            report.records_read
        )));
    }

    Ok(())
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!(
        "Starting search server for index {} on {}:{}",
        settings.pinecone.index_name, settings.server.host, settings.server.port
    );

    let embedder = match commands::build_embedder(&settings) {
        Ok(embedder) => Some(embedder),
        Err(e) => {
            warn!("Embedding client unavailable: {}", e.log_safe());
            None
        }
    };

    let gateway = match commands::build_gateway(&settings) {
        Ok(gateway) => Some(gateway),
        Err(e) => {
            warn!("Vector index client unavailable: {}", e.log_safe());
            None
        }
    };

    let state = AppState {
        embedder,
        gateway,
        settings: settings.clone(),
    };

    let app = routes::create_router(state, &settings);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    println!("recipe-search listening on http://{addr}");
    println!("  index      {}", settings.pinecone.index_name);
    println!("  search     POST /api/search {{\"query\": \"...\"}}");
    println!("  probes     GET /health, GET /ready\n");

    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Search server stopped");
    Ok(())
}
