use crate::index::QueryMatch;
use serde::{Deserialize, Serialize};

/// Search request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    /// Missing and `null` both count as an empty query
    #[serde(default)]
    pub query: Option<String>,
}

impl SearchRequest {
    pub fn query(&self) -> &str {
        self.query.as_deref().unwrap_or_default()
    }
}

/// Search response
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub matches: Vec<QueryMatch>,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub embedding: String,
    pub vector_index: String,
}
