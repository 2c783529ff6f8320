pub mod config;
pub mod error;

// Ingestion pipeline
pub mod batch;
pub mod compose;
pub mod embedding;
pub mod index;
pub mod ingest;
pub mod source;

// Query path
pub mod api;
pub mod search;

pub mod cli;

// Utilities
pub mod utils;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
