pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recipe-search")]
#[command(about = "Semantic recipe search - ingestion pipeline and query server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed recipes from a CSV export and upsert them into the vector index
    Ingest {
        /// Source CSV file
        #[arg(short, long, env = "SOURCE_FILE")]
        file: Option<PathBuf>,

        /// Number of rows to ingest from the start of the file
        #[arg(short, long, env = "INGEST_LIMIT")]
        limit: Option<usize>,

        /// Records per batch
        #[arg(long, env = "INGEST_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Records processed concurrently within a batch
        #[arg(long, env = "INGEST_CONCURRENCY")]
        concurrency: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the search server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Run one semantic search and print the matches
    Search {
        /// Free-text query
        query: String,

        /// Number of matches to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
}
