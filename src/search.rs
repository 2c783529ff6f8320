use crate::embedding::{embed_one, Embedder};
use crate::error::{Error, Result};
use crate::index::{IndexGateway, QueryMatch};
use tracing::debug;

/// Embed `query` and return the `top_k` closest recipes with their metadata
pub async fn semantic_search(
    embedder: &dyn Embedder,
    gateway: &IndexGateway,
    index_name: &str,
    query: &str,
    top_k: usize,
) -> Result<Vec<QueryMatch>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::InvalidQuery("Please enter a valid query".to_string()));
    }

    debug!("Semantic search in {}: {:?} (top {})", index_name, query, top_k);

    let vector = embed_one(embedder, query).await?;
    gateway.query(index_name, &vector, top_k, true).await
}
