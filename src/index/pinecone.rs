use crate::config::{PineconeConfig, UpstreamConfig};
use crate::error::{Error, Result};
use crate::index::models::{IndexEntry, IndexSpec, QueryMatch, RecipeMetadata};
use crate::index::VectorStore;
use crate::utils::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// Pinecone REST client (controller + per-index data plane)
#[derive(Clone)]
pub struct PineconeClient {
    client: Client,
    controller_url: String,
    index_host: Option<String>,
    hosts: Arc<RwLock<HashMap<String, String>>>,
    retry: RetryPolicy,
}

impl PineconeClient {
    pub fn new(config: &PineconeConfig, upstream: &UpstreamConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("PINECONE_API_KEY is not set".to_string()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "api-key",
            header::HeaderValue::from_str(api_key.trim())
                .map_err(|e| Error::Config(format!("Invalid Pinecone API key: {e}")))?,
        );
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(upstream.timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
            index_host: config.index_host.as_deref().map(normalize_host),
            hosts: Arc::new(RwLock::new(HashMap::new())),
            retry: RetryPolicy::new(upstream.max_retries, upstream.initial_backoff()),
        })
    }

    /// Send a request, retrying transient failures, and return the body of a
    /// successful response. Non-success responses become `Error::IndexService`.
    async fn execute<F>(&self, label: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let build = &build;

        self.retry
            .run(label, || async move {
                let response = build().send().await?;

                let status = response.status();
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read response body".to_string());

                if !status.is_success() {
                    error!("Pinecone API error: {} - {}", status, body);
                    return Err(Error::IndexService {
                        status: Some(status.as_u16()),
                        payload: body,
                    });
                }

                Ok(body)
            })
            .await
    }

    /// Data-plane base URL for `index`
    async fn resolve_host(&self, index: &str) -> Result<String> {
        if let Some(host) = &self.index_host {
            return Ok(host.clone());
        }

        if let Some(host) = self.hosts.read().await.get(index) {
            return Ok(host.clone());
        }

        let url = format!("{}/databases/{}", self.controller_url, index);
        debug!("Pinecone API request: GET {}", url);

        let body = self
            .execute("Pinecone describe index", || self.client.get(&url))
            .await?;
        let described: DescribeIndexResponse = parse(&body)?;

        if described.status.host.trim().is_empty() {
            return Err(Error::IndexService {
                status: None,
                payload: format!("Index {index} has no host yet"),
            });
        }

        let host = normalize_host(&described.status.host);
        self.hosts
            .write()
            .await
            .insert(index.to_string(), host.clone());

        Ok(host)
    }
}

#[async_trait]
impl VectorStore for PineconeClient {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let url = format!("{}/databases", self.controller_url);
        debug!("Pinecone API request: GET {}", url);

        let body = self
            .execute("Pinecone list indexes", || self.client.get(&url))
            .await
            .map_err(|e| Error::IndexProvisioning(format!("Failed to list indexes: {e}")))?;

        parse(&body).map_err(|e| Error::IndexProvisioning(e.to_string()))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/databases", self.controller_url);
        let request = CreateIndexRequest {
            name: &spec.name,
            dimension: spec.dimension,
            metric: &spec.metric,
            metadata_config: MetadataConfig {
                indexed: &spec.indexed_fields,
            },
        };
        debug!("Pinecone API request: POST {} ({})", url, spec.name);

        match self
            .execute("Pinecone create index", || {
                self.client.post(&url).json(&request)
            })
            .await
        {
            Ok(_) => Ok(()),
            // Created concurrently by someone else
            Err(Error::IndexService {
                status: Some(409), ..
            }) => Ok(()),
            Err(e) => Err(Error::IndexProvisioning(format!(
                "Failed to create index {}: {e}",
                spec.name
            ))),
        }
    }

    async fn upsert(&self, index: &str, entries: &[IndexEntry]) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let write_error = |e: Error| Error::IndexWrite {
            message: e.to_string(),
            entries: entries.to_vec(),
        };

        let host = self.resolve_host(index).await.map_err(write_error)?;
        let url = format!("{host}/vectors/upsert");
        let request = UpsertRequest {
            vectors: entries
                .iter()
                .map(|entry| WireVector {
                    id: entry.vector_id(),
                    values: &entry.values,
                    metadata: &entry.metadata,
                })
                .collect(),
        };
        debug!("Pinecone API request: POST {} ({} vectors)", url, entries.len());

        let body = self
            .execute("Pinecone upsert", || self.client.post(&url).json(&request))
            .await
            .map_err(write_error)?;

        let response: UpsertResponse = parse(&body).map_err(write_error)?;
        Ok(response.upserted_count.unwrap_or(entries.len()))
    }

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        let host = self.resolve_host(index).await?;
        let url = format!("{host}/query");
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
        };
        debug!("Pinecone API request: POST {} (topK {})", url, top_k);

        let body = self
            .execute("Pinecone query", || self.client.post(&url).json(&request))
            .await?;
        let response: QueryResponse = parse(&body)?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| QueryMatch::from_vector_id(m.id, m.score, m.metadata))
            .collect())
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::IndexService {
        status: None,
        payload: format!("Failed to parse Pinecone response: {e}"),
    })
}

#[derive(Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    metadata_config: MetadataConfig<'a>,
}

#[derive(Serialize)]
struct MetadataConfig<'a> {
    indexed: &'a [String],
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    status: IndexStatus,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    host: String,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
}

#[derive(Serialize)]
struct WireVector<'a> {
    id: String,
    values: &'a [f32],
    metadata: &'a RecipeMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<RecipeMetadata>,
}
