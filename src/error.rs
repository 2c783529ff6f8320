use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::index::models::IndexEntry;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Source read error: {0}")]
    SourceRead(String),

    #[error("Embedding service error: {payload}")]
    EmbeddingService { status: Option<u16>, payload: String },

    #[error("Index provisioning error: {0}")]
    IndexProvisioning(String),

    #[error("Index write error ({} entries): {message}", .entries.len())]
    IndexWrite {
        message: String,
        entries: Vec<IndexEntry>,
    },

    #[error("Vector index service error: {payload}")]
    IndexService { status: Option<u16>, payload: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Get a sanitized error message safe for logging
    /// Filters out potentially sensitive information
    pub fn log_safe(&self) -> String {
        match self {
            // Upstream payloads may echo request headers or keys
            Error::EmbeddingService { status, .. } => match status {
                Some(status) => format!("Embedding service returned HTTP {status}"),
                None => "Embedding service unreachable".to_string(),
            },
            Error::IndexService { status, .. } => match status {
                Some(status) => format!("Vector index returned HTTP {status}"),
                None => "Vector index unreachable".to_string(),
            },
            Error::Http(_) => "External HTTP request failed".to_string(),

            Error::Internal(msg) | Error::Config(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("secret") || lower.contains("token") || lower.contains("key") {
                    "Error details redacted".to_string()
                } else {
                    self.to_string()
                }
            }

            Error::IndexWrite { entries, .. } => {
                format!("Vector index write failed for {} entries", entries.len())
            }

            Error::SourceRead(_)
            | Error::IndexProvisioning(_)
            | Error::InvalidQuery(_)
            | Error::Validation(_) => self.to_string(),
        }
    }

    /// Upstream HTTP status and body, when the error came back from a provider
    pub fn upstream(&self) -> Option<(u16, &str)> {
        match self {
            Error::EmbeddingService {
                status: Some(status),
                payload,
            }
            | Error::IndexService {
                status: Some(status),
                payload,
            } => Some((*status, payload.as_str())),
            _ => None,
        }
    }

    /// Whether the failure is worth retrying (rate limits, server errors, transport)
    pub fn is_transient(&self) -> bool {
        match self {
            Error::EmbeddingService { status, .. } | Error::IndexService { status, .. } => {
                match status {
                    Some(status) => *status == 429 || *status >= 500,
                    None => true,
                }
            }
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Forward the upstream status and body verbatim.
    ///
    /// Falls back to the sanitized response when the error did not come from a provider.
    pub fn into_upstream_response(self) -> Response {
        let upstream = self
            .upstream()
            .map(|(status, payload)| (status, payload.to_string()));
        let Some((status, payload)) = upstream else {
            return self.into_response();
        };

        tracing::error!("Forwarding upstream error: {} {}", status, payload);

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        let body = serde_json::from_str::<serde_json::Value>(&payload)
            .unwrap_or_else(|_| json!({ "error": { "message": payload } }));

        (status, Json(body)).into_response()
    }
}

// Implement IntoResponse for API error handling
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("Request error: {}", self.log_safe());
        if let Some((status, payload)) = self.upstream() {
            tracing::error!("Upstream response: {} {}", status, payload);
        }

        let (status, message) = match &self {
            Error::InvalidQuery(msg) | Error::Validation(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred during your request.".to_string(),
            ),
        };

        let body = Json(json!({
            "error": { "message": message },
        }));

        (status, body).into_response()
    }
}
