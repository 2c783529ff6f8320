//! Vector index access.
//!
//! [`VectorStore`] is the narrow contract a vector service has to satisfy;
//! [`IndexGateway`] layers index provisioning, upsert batching and error
//! classification on top of it.

pub mod models;
pub mod pinecone;

pub use models::{IndexEntry, IndexSpec, QueryMatch, RecipeMetadata};
pub use pinecone::PineconeClient;

use crate::batch::partition;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Similarity metric used for newly created indexes
pub const DEFAULT_METRIC: &str = "cosine";

/// Operations a vector service provides
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of all existing indexes
    async fn list_indexes(&self) -> Result<Vec<String>>;

    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Write entries in a single request; returns how many were written
    async fn upsert(&self, index: &str, entries: &[IndexEntry]) -> Result<usize>;

    async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>>;
}

/// Shared handle for provisioning, writing to and querying an index
#[derive(Clone)]
pub struct IndexGateway {
    store: Arc<dyn VectorStore>,
    upsert_batch_size: usize,
}

impl IndexGateway {
    pub fn new(store: Arc<dyn VectorStore>, upsert_batch_size: usize) -> Self {
        Self {
            store,
            upsert_batch_size: upsert_batch_size.max(1),
        }
    }

    /// Create `name` unless it already exists. Returns whether it was created.
    pub async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        indexed_fields: &[String],
    ) -> Result<bool> {
        let existing = self.store.list_indexes().await.map_err(provisioning)?;

        if existing.iter().any(|index| index == name) {
            debug!("Index {} already exists", name);
            return Ok(false);
        }

        let spec = IndexSpec {
            name: name.to_string(),
            dimension,
            metric: DEFAULT_METRIC.to_string(),
            indexed_fields: indexed_fields.to_vec(),
        };

        self.store.create_index(&spec).await.map_err(provisioning)?;

        info!(
            "Created index {} (dimension {}, indexed fields: {})",
            name,
            dimension,
            indexed_fields.join(", ")
        );

        Ok(true)
    }

    /// Write `entries`, split into requests of at most the configured upsert size.
    ///
    /// On failure the error carries the request that failed; earlier requests
    /// stay written.
    pub async fn upsert(&self, index: &str, entries: Vec<IndexEntry>) -> Result<usize> {
        let mut written = 0;

        for chunk in partition(entries, self.upsert_batch_size)? {
            match self.store.upsert(index, &chunk).await {
                Ok(count) => written += count,
                Err(Error::IndexWrite { message, .. }) => {
                    return Err(Error::IndexWrite {
                        message,
                        entries: chunk,
                    })
                }
                Err(e) => {
                    return Err(Error::IndexWrite {
                        message: e.to_string(),
                        entries: chunk,
                    })
                }
            }
        }

        debug!("Upserted {} vectors into {}", written, index);

        Ok(written)
    }

    /// Nearest `top_k` entries to `vector`
    pub async fn query(
        &self,
        index: &str,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<QueryMatch>> {
        if top_k == 0 {
            return Err(Error::Validation("top_k must be greater than zero".to_string()));
        }

        let mut matches = self
            .store
            .query(index, vector, top_k, include_metadata)
            .await?;
        matches.truncate(top_k);

        Ok(matches)
    }
}

fn provisioning(e: Error) -> Error {
    match e {
        Error::IndexProvisioning(_) => e,
        other => Error::IndexProvisioning(other.to_string()),
    }
}
