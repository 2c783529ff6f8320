use crate::config::{OpenAiConfig, UpstreamConfig};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::utils::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Client for OpenAI-compatible `/embeddings` endpoints
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    batch_limit: usize,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig, upstream: &UpstreamConfig) -> Result<Self> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            Error::Config(
                "OpenAI API key not configured, please set OPENAI_API_KEY".to_string(),
            )
        })?;

        if config.model.trim().is_empty() {
            return Err(Error::Config("OPENAI_MODEL must not be empty".to_string()));
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .map_err(|e| Error::Config(format!("Invalid OpenAI API key: {e}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(upstream.timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            batch_limit: config.batch_limit.max(1),
            retry: RetryPolicy::new(upstream.max_retries, upstream.initial_backoff()),
        })
    }

    async fn request_once(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::EmbeddingService {
                status: None,
                payload: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            error!("Embedding API error: {} - {}", status, body);
            return Err(Error::EmbeddingService {
                status: Some(status.as_u16()),
                payload: body,
            });
        }

        let mut parsed: EmbeddingResponse =
            response.json().await.map_err(|e| Error::EmbeddingService {
                status: Some(status.as_u16()),
                payload: format!("Failed to parse embeddings response: {e}"),
            })?;

        parsed.data.sort_by_key(|entry| entry.index);

        if parsed.data.len() != inputs.len() {
            return Err(Error::EmbeddingService {
                status: Some(status.as_u16()),
                payload: format!(
                    "Embedding service returned {} vectors for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                ),
            });
        }

        Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Err(Error::Validation(
                "Embedding request needs at least one input".to_string(),
            ));
        }
        if inputs.len() > self.batch_limit {
            return Err(Error::Validation(format!(
                "Embedding batch of {} exceeds limit {}",
                inputs.len(),
                self.batch_limit
            )));
        }

        debug!(
            "Embedding {} inputs with {} via {}",
            inputs.len(),
            self.model,
            self.endpoint
        );

        self.retry
            .run("Embedding request", || self.request_once(inputs))
            .await
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
