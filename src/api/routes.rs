use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

#[cfg(not(test))]
use {
    axum::extract::ConnectInfo,
    std::net::{IpAddr, SocketAddr},
    std::sync::Arc,
    tower_governor::{governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorLayer},
    tracing::warn,
};

use crate::api::handlers::{self, AppState};
use crate::config::Settings;

/// Governor parameters for a limit of `requests` per second per client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    /// One request is replenished every `replenish_ms` milliseconds
    pub replenish_ms: u64,
    /// Requests a fresh client may send at once
    pub burst: u32,
}

impl RateQuota {
    /// Rates above 1000/s are clamped to one request per millisecond.
    pub fn per_second(requests: u64) -> Self {
        let requests = requests.max(1);
        Self {
            replenish_ms: (1000 / requests).max(1),
            burst: u32::try_from(requests)
                .unwrap_or(u32::MAX)
                .saturating_mul(2),
        }
    }
}

/// Create the router with the search endpoint and health checks
#[cfg_attr(test, allow(unused_variables))]
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    #[cfg_attr(test, allow(unused_mut))]
    let mut api_routes = Router::new()
        .route("/search", post(handlers::search_recipes))
        .with_state(state.clone());

    // Each search costs an embedding call, so the endpoint is rate limited per client IP.
    // Falls back to 127.0.0.1 when the peer address is unavailable.
    #[cfg(not(test))]
    {
        #[derive(Clone, Copy, Debug)]
        struct FallbackIpKeyExtractor;

        impl KeyExtractor for FallbackIpKeyExtractor {
            type Key = IpAddr;

            fn extract<B>(
                &self,
                req: &axum::http::Request<B>,
            ) -> Result<Self::Key, tower_governor::GovernorError> {
                if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
                    return Ok(addr.ip());
                }

                Ok(IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)))
            }
        }

        let quota = RateQuota::per_second(settings.server.api_rate_limit);

        match GovernorConfigBuilder::default()
            .key_extractor(FallbackIpKeyExtractor)
            .per_millisecond(quota.replenish_ms)
            .burst_size(quota.burst)
            .finish()
        {
            Some(config) => {
                api_routes = api_routes.layer(GovernorLayer {
                    config: Arc::new(config),
                });
            }
            None => warn!("Invalid rate limit configuration, search endpoint is not rate limited"),
        }
    }

    let api_routes = api_routes;

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            // Request body size limit - queries are short
            RequestBodyLimitLayer::new(settings.server.max_request_body_size),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .allow_origin(tower_http::cors::Any)
                .max_age(Duration::from_secs(3600)),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(TraceLayer::new_for_http())
}
