use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub openai: OpenAiConfig,
    pub pinecone: PineconeConfig,
    pub upstream: UpstreamConfig,
    pub ingest: IngestConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Unset means the query endpoint answers 500 until configured
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Maximum number of inputs accepted in one embeddings request
    pub batch_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub environment: String,
    pub controller_url: String,
    /// Data-plane host override; resolved through the controller when unset
    pub index_host: Option<String>,
    pub index_name: String,
    pub upsert_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub source_file: PathBuf,
    pub record_limit: usize,
    pub batch_size: usize,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_rate_limit: u64,
    pub max_request_body_size: usize,
    pub top_k: usize,
    pub forward_upstream_errors: bool,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

fn env_or<T: FromStr>(name: &str, default: &str) -> Result<T> {
    std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| Error::Config(format!("Invalid {name} value")))
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let environment =
            std::env::var("PINECONE_ENVIRONMENT").unwrap_or_else(|_| "us-east1-gcp".to_string());
        let controller_url = std::env::var("PINECONE_CONTROLLER_URL")
            .unwrap_or_else(|_| format!("https://controller.{environment}.pinecone.io"));

        let batch_size: usize = env_or("INGEST_BATCH_SIZE", "32")?;
        let concurrency = match env_opt("INGEST_CONCURRENCY") {
            Some(value) => value
                .parse()
                .map_err(|_| Error::Config("Invalid INGEST_CONCURRENCY value".to_string()))?,
            None => batch_size,
        };

        Ok(Settings {
            openai: OpenAiConfig {
                api_key: env_opt("OPENAI_API_KEY"),
                base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: std::env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| "text-embedding-ada-002".to_string()),
                batch_limit: env_or("EMBEDDING_BATCH_LIMIT", "2048")?,
            },
            pinecone: PineconeConfig {
                api_key: env_opt("PINECONE_API_KEY"),
                environment,
                controller_url,
                index_host: env_opt("PINECONE_INDEX_HOST"),
                index_name: std::env::var("INDEX_NAME").unwrap_or_else(|_| "recipes".to_string()),
                upsert_batch_size: env_or("UPSERT_BATCH_SIZE", "100")?,
            },
            upstream: UpstreamConfig {
                timeout_seconds: env_or("UPSTREAM_TIMEOUT", "30")?,
                max_retries: env_or("UPSTREAM_MAX_RETRIES", "3")?,
                initial_backoff_ms: env_or("UPSTREAM_INITIAL_BACKOFF_MS", "500")?,
            },
            ingest: IngestConfig {
                source_file: std::env::var("SOURCE_FILE")
                    .unwrap_or_else(|_| "./data/RAW_recipes.csv".to_string())
                    .into(),
                record_limit: env_or("INGEST_LIMIT", "1600")?,
                batch_size,
                concurrency,
            },
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("PORT", "3000")?,
                api_rate_limit: env_or("API_RATE_LIMIT", "10")?,
                max_request_body_size: env_or("MAX_REQUEST_BODY_SIZE", "65536")?,
                top_k: env_or("SEARCH_TOP_K", "5")?,
                forward_upstream_errors: env_or("FORWARD_UPSTREAM_ERRORS", "false")?,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.server.top_k == 0 {
            return Err(Error::Config("SEARCH_TOP_K must be non-zero".to_string()));
        }

        if self.server.api_rate_limit == 0 {
            return Err(Error::Config("API rate limit must be non-zero".to_string()));
        }

        if self.ingest.batch_size == 0 || self.ingest.concurrency == 0 {
            return Err(Error::Config(
                "Ingest batch size and concurrency must be non-zero".to_string(),
            ));
        }

        if self.openai.batch_limit == 0 || self.pinecone.upsert_batch_size == 0 {
            return Err(Error::Config("Provider batch limits must be non-zero".to_string()));
        }

        for (name, value) in [
            ("OPENAI_BASE_URL", &self.openai.base_url),
            ("PINECONE_CONTROLLER_URL", &self.pinecone.controller_url),
        ] {
            let url = url::Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid {name}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!("{name} must use http or https")));
            }
        }

        Ok(())
    }
}
