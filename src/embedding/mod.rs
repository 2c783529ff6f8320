//! Text embedding clients.

pub mod openai;

pub use openai::OpenAiEmbedder;

use crate::batch::partition;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Converts text into fixed-length vectors through an external service
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `inputs` in a single request. The result has the same length and
    /// order as `inputs`. `inputs` must be non-empty and within [`Embedder::batch_limit`].
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Largest number of inputs accepted by one [`Embedder::embed`] call
    fn batch_limit(&self) -> usize;

    fn model(&self) -> &str;
}

/// Embed any number of inputs, splitting into requests of at most the
/// embedder's batch limit. Order is preserved.
pub async fn embed_all(embedder: &dyn Embedder, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let mut vectors = Vec::with_capacity(inputs.len());
    for chunk in partition(inputs.to_vec(), embedder.batch_limit())? {
        let expected = chunk.len();
        let embedded = embedder.embed(&chunk).await?;
        if embedded.len() != expected {
            return Err(Error::EmbeddingService {
                status: None,
                payload: format!(
                    "Embedding service returned {} vectors for {} inputs",
                    embedded.len(),
                    expected
                ),
            });
        }
        vectors.extend(embedded);
    }

    Ok(vectors)
}

/// Embed a single string
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embed_all(embedder, &[text.to_string()])
        .await?
        .pop()
        .ok_or_else(|| Error::EmbeddingService {
            status: None,
            payload: "Embedding service returned no vectors".to_string(),
        })
}
