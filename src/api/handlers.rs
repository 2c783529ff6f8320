use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::{
    api::models::*, config::Settings, embedding::Embedder, index::IndexGateway,
    search::semantic_search, Error, Result,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// `None` when no embedding credential is configured
    pub embedder: Option<Arc<dyn Embedder>>,
    pub gateway: Option<IndexGateway>,
    pub settings: Settings,
}

/// POST /api/search - Semantic recipe search
///
/// A body that is not a JSON object with a string `query` is treated as an
/// empty query.
pub async fn search_recipes(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Unreadable search body: {}", rejection.body_text());
            SearchRequest::default()
        }
    };

    match run_search(&state, &request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) if state.settings.server.forward_upstream_errors => e.into_upstream_response(),
        Err(e) => e.into_response(),
    }
}

async fn run_search(state: &AppState, request: &SearchRequest) -> Result<SearchResponse> {
    let embedder = state.embedder.as_ref().ok_or_else(|| {
        Error::Config(
            "OpenAI API key not configured, please follow instructions in README.md".to_string(),
        )
    })?;

    if request.query().trim().is_empty() {
        return Err(Error::InvalidQuery("Please enter a valid query".to_string()));
    }

    let gateway = state
        .gateway
        .as_ref()
        .ok_or_else(|| Error::Config("Vector index not configured".to_string()))?;

    debug!("Search request: {:?}", request.query());

    let matches = semantic_search(
        embedder.as_ref(),
        gateway,
        &state.settings.pinecone.index_name,
        request.query(),
        state.settings.server.top_k,
    )
    .await?;

    Ok(SearchResponse { matches })
}

/// GET /health - Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

/// GET /ready - Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let embedding_ready = state.embedder.is_some();
    let index_ready = state.gateway.is_some();
    let ready = embedding_ready && index_ready;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            embedding: if embedding_ready { "ok" } else { "not configured" }.to_string(),
            vector_index: if index_ready { "ok" } else { "not configured" }.to_string(),
        }),
    )
}
